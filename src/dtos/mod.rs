//! DTOs module - Data Transfer Objects
//!
//! DTOs separate the external (API) representation from the internal one
//! (entities). Request bodies carry their `validator` rules and declared
//! field order.

pub mod product;
pub mod query;
pub mod user;

pub use product::{CreateProductDTO, ProductStatsDTO, UpdateProductDTO};
pub use query::{ListQuery, ProductFilters, UserFilters};
pub use user::{
    AuthResponseDTO, CreateUserDTO, LoginDTO, RegisterDTO, UpdatePasswordDTO, UpdateProfileDTO,
    UpdateUserDTO, UserDTO,
};
