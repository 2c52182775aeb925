//! View components.

pub mod auth_form;
pub mod dashboard;
pub mod landing;
