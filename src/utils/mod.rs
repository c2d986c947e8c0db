mod access;
pub use access::ToVector3;
