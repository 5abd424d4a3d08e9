/// Per-group limits and alignment checks shared by enumeration strategies.
pub mod grouping;
