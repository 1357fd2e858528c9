pub mod cell;
pub mod row;
pub mod schema;
pub mod selection;
pub mod value;

pub use cell::{CellKey, CellPosition, GridBounds, KEY_SEPARATOR};
pub use row::{RowRecord, RowStore};
pub use schema::{ColumnDescriptor, DataType, DisplayOptions, LookupOption};
pub use selection::{CellRange, Selection};
pub use value::{CellValue, ComparableValue, LookupValue};
