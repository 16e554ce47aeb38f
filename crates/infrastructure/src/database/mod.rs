pub mod entities;
mod sea_orm_store;

pub use sea_orm_store::SeaOrmStore;
