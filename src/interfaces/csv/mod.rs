pub mod product_reader;
pub mod product_writer;
