pub mod range;
pub mod range_mutator;
pub mod selection;
pub mod structured_document;
pub mod style_editor;
