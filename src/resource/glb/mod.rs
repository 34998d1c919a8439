pub mod accessor;
pub mod buffer;
pub mod container;
pub mod document;
pub mod file;
pub mod image;
pub mod primitive;
pub mod tangent;
pub mod vertex;
pub mod widen;
