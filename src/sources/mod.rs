//! Everything that feeds the registry.
//!
//! - **builtin**: EL keywords, implicit objects and attribute scopes
//! - **tlds**: taglibs loaded from TLD files in the configured directories
//! - **document_vars**: variables declared by the active document
pub mod builtin;
pub mod document_vars;
pub mod tlds;
