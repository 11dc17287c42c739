pub mod identifiers;
pub mod synthetic_alias;
pub mod text_edit;
