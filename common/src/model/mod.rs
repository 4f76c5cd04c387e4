pub mod export;
pub mod invoice;
pub mod record;
pub mod session;
