//! Domain types shared by the storage and HTTP layers: the data model, the
//! post form and page arithmetic.

pub mod form;
pub mod model;
pub mod pagination;
