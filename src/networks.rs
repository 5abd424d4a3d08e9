//! Generator and discriminator seams.
//!
//! Network topologies live outside this crate. Callers implement
//! [`Translator`] and [`Critic`] on their own `burn` modules and hand them to
//! the model inside a [`Networks`] value.

use burn::prelude::*;

use crate::config::ModelVariant;

/// Image-to-image generator.
pub trait Translator<B: Backend> {
    /// Translate a `[N, C_in, H, W]` batch into `[N, C_out, H, W]`.
    fn translate(&self, input: Tensor<B, 4>) -> Tensor<B, 4>;
}

/// Real/fake discriminator returning unnormalized scores (logits or patch maps).
pub trait Critic<B: Backend> {
    /// Score a `[N, C, H, W]` batch.
    fn critique(&self, input: Tensor<B, 4>) -> Tensor<B, 4>;
}

/// Network role inside a variant.
///
/// The paired variant only has role `A` (its single generator and discriminator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkRole {
    /// `G_A` (source → target) or `D_A` (judges the target domain).
    A,
    /// `G_B` (target → translated source part) or `D_B` (judges that part).
    B,
}

impl NetworkRole {
    /// Suffix used in loss and log names.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkRole::A => "A",
            NetworkRole::B => "B",
        }
    }
}

/// Generator and discriminator modules of one variant.
///
/// Both cyclic generators share the type `G`. When `G_A` and `G_B` use
/// different topologies, wrap them in an enum whose `Translator` impl
/// dispatches to the active variant:
///
/// ```ignore
/// enum Generator<B: Backend> {
///     Layered(LayeredResnet<B>),
///     Plain(Resnet<B>),
/// }
///
/// impl<B: Backend> Translator<B> for Generator<B> {
///     fn translate(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
///         match self {
///             Generator::Layered(net) => net.translate(input),
///             Generator::Plain(net) => net.translate(input),
///         }
///     }
/// }
/// ```
///
/// Deriving `Module` on that enum keeps it trainable by the
/// [`Trainer`](crate::trainer::Trainer).
#[derive(Clone, Debug)]
pub enum Networks<G, D> {
    /// One generator and one conditional discriminator.
    Paired {
        /// Source → target generator.
        generator: G,
        /// Discriminator over `cat(source, target)`.
        discriminator: D,
    },
    /// Two generators and two discriminators.
    Cyclic {
        /// Source composite → target.
        g_a: G,
        /// Target → translated source part.
        g_b: G,
        /// Judges the target domain.
        d_a: D,
        /// Judges the translated source part.
        d_b: D,
    },
}

impl<G, D> Networks<G, D> {
    /// Variant these networks implement.
    pub fn variant(&self) -> ModelVariant {
        match self {
            Networks::Paired { .. } => ModelVariant::Paired,
            Networks::Cyclic { .. } => ModelVariant::Cyclic,
        }
    }

    /// Generator roles present in the variant.
    pub fn generator_roles(&self) -> &'static [NetworkRole] {
        match self {
            Networks::Paired { .. } => &[NetworkRole::A],
            Networks::Cyclic { .. } => &[NetworkRole::A, NetworkRole::B],
        }
    }

    /// Discriminator roles present in the variant.
    pub fn discriminator_roles(&self) -> &'static [NetworkRole] {
        self.generator_roles()
    }

    /// Generator for `role`, if the variant has one.
    pub fn generator(&self, role: NetworkRole) -> Option<&G> {
        match (self, role) {
            (Networks::Paired { generator, .. }, NetworkRole::A) => Some(generator),
            (Networks::Cyclic { g_a, .. }, NetworkRole::A) => Some(g_a),
            (Networks::Cyclic { g_b, .. }, NetworkRole::B) => Some(g_b),
            _ => None,
        }
    }

    /// Mutable generator for `role`.
    pub fn generator_mut(&mut self, role: NetworkRole) -> Option<&mut G> {
        match (self, role) {
            (Networks::Paired { generator, .. }, NetworkRole::A) => Some(generator),
            (Networks::Cyclic { g_a, .. }, NetworkRole::A) => Some(g_a),
            (Networks::Cyclic { g_b, .. }, NetworkRole::B) => Some(g_b),
            _ => None,
        }
    }

    /// Discriminator for `role`, if the variant has one.
    pub fn discriminator(&self, role: NetworkRole) -> Option<&D> {
        match (self, role) {
            (Networks::Paired { discriminator, .. }, NetworkRole::A) => Some(discriminator),
            (Networks::Cyclic { d_a, .. }, NetworkRole::A) => Some(d_a),
            (Networks::Cyclic { d_b, .. }, NetworkRole::B) => Some(d_b),
            _ => None,
        }
    }

    /// Mutable discriminator for `role`.
    pub fn discriminator_mut(&mut self, role: NetworkRole) -> Option<&mut D> {
        match (self, role) {
            (Networks::Paired { discriminator, .. }, NetworkRole::A) => Some(discriminator),
            (Networks::Cyclic { d_a, .. }, NetworkRole::A) => Some(d_a),
            (Networks::Cyclic { d_b, .. }, NetworkRole::B) => Some(d_b),
            _ => None,
        }
    }
}

impl<G: Clone, D: Clone> Networks<G, D> {
    /// Replace the generator of `role` with `update(current)`.
    ///
    /// Optimizers consume and return modules, so the update takes ownership of a
    /// handle to the current parameters. Returns false when the role is absent.
    pub fn update_generator(&mut self, role: NetworkRole, update: impl FnOnce(G) -> G) -> bool {
        match self.generator_mut(role) {
            Some(slot) => {
                *slot = update(slot.clone());
                true
            }
            None => false,
        }
    }

    /// Replace the discriminator of `role` with `update(current)`.
    pub fn update_discriminator(
        &mut self,
        role: NetworkRole,
        update: impl FnOnce(D) -> D,
    ) -> bool {
        match self.discriminator_mut(role) {
            Some(slot) => {
                *slot = update(slot.clone());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_networks_expose_role_a_only() {
        let networks: Networks<u8, u16> = Networks::Paired {
            generator: 1,
            discriminator: 2,
        };
        assert_eq!(networks.variant(), ModelVariant::Paired);
        assert_eq!(networks.generator(NetworkRole::A), Some(&1));
        assert_eq!(networks.generator(NetworkRole::B), None);
        assert_eq!(networks.discriminator_roles(), &[NetworkRole::A]);
    }

    #[test]
    fn cyclic_updates_target_the_named_role() {
        let mut networks: Networks<u8, u16> = Networks::Cyclic {
            g_a: 1,
            g_b: 2,
            d_a: 3,
            d_b: 4,
        };
        assert!(networks.update_generator(NetworkRole::B, |g| g + 10));
        assert!(networks.update_discriminator(NetworkRole::A, |d| d * 2));
        assert_eq!(networks.generator(NetworkRole::A), Some(&1));
        assert_eq!(networks.generator(NetworkRole::B), Some(&12));
        assert_eq!(networks.discriminator(NetworkRole::A), Some(&6));
        assert_eq!(networks.discriminator(NetworkRole::B), Some(&4));
    }
}
