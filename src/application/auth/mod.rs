//! Authorization - who may run which command, and where

pub mod authorizer;
pub mod staff;

pub use authorizer::{check_locality, check_privilege, Authorizer, StandardAuthorizer};
pub use staff::StaffAuthority;
