pub mod cell;
pub mod range;
pub mod sheet;
pub mod wire;
pub mod workbook;
