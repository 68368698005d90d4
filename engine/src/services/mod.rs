//! Business logic services for the Stockroom engine

pub mod inventories;
pub mod invoices;
pub mod items;
pub mod stock;
pub mod users;

pub use inventories::InventoryService;
pub use invoices::InvoiceService;
pub use items::ItemService;
pub use stock::StockLevelService;
pub use users::UserService;
