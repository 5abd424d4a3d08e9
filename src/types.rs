/// Semantic role of one layer of a sample.
/// Examples: `object`, `scene`, `structure`, `image`
pub type RoleName = String;
/// Composite slot or slot-part identifier.
/// Examples: `A`, `B`, `A1`, `A2`, `A3`
pub type SlotName = String;
/// Top-level group identifier used by grouped dataset layouts.
/// Examples: `cola`, `sprite`, `milk`, `tea`
pub type GroupId = String;
/// Dataset phase directory name.
/// Examples: `train`, `test`, `val`
pub type PhaseName = String;
/// Provenance path rendered as text for logging and batch metadata.
/// Example: `datasets/advnet/train/cola/cola_object/0001.png`
pub type PathString = String;
/// Name of an introspectable tensor slot on the model.
/// Examples: `real_A1`, `fake_B`, `rec_A2`
pub type VisualName = &'static str;
/// Name of a reported loss scalar.
/// Examples: `G_A`, `cycle_A`, `idt_B`, `D_A`
pub type LossName = &'static str;
