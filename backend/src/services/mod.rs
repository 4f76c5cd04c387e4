pub mod drive;
pub mod editor;
pub mod invoices;
pub mod logo;
pub mod session;
