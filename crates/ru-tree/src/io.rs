//! Parquet / Arrow persistence for [`Tree`].
//!
//! # Layout
//!
//! One Arrow column per branch, in branch creation order:
//!
//! | Branch kind | Arrow type                                  |
//! |-------------|---------------------------------------------|
//! | `i32`       | `Int32`                                     |
//! | `bool`      | `Boolean`                                   |
//! | `f32`       | `Float32`                                   |
//! | `String`    | `Utf8`                                      |
//! | `Lv`        | `Struct<px, py, pz, e: Float32>`            |
//! | `Bits`      | `Binary` (little-endian packed)             |
//! | `u64`       | `UInt64`                                    |
//! | `Vec<T>`    | `List<T>` of the element type above         |
//!
//! ## Schema key-value metadata
//!
//! | Key                      | Value                                   |
//! |--------------------------|-----------------------------------------|
//! | `rooutil.tree_name`      | tree name                               |
//! | `rooutil.tree_title`     | tree title                              |
//! | `rooutil.branch_kinds`   | JSON object `{"branch": "vec_lv", ..}`  |
//!
//! Files without the kinds entry are still readable: kinds are inferred from
//! the Arrow types.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Float32Array, Int32Array, ListArray,
    StringArray, StructArray, UInt64Array,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Fields, Float32Type, Int32Type, Schema, UInt64Type};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;
use tracing::{debug, warn};

use ru_core::{Bits, BranchKind, Error, Lv, Result};

use crate::config::TreeConfig;
use crate::tree::{Column, ColumnData, Tree};
use crate::value::BranchValue;

/// Metadata key for the tree name.
pub const META_KEY_TREE_NAME: &str = "rooutil.tree_name";

/// Metadata key for the tree title.
pub const META_KEY_TREE_TITLE: &str = "rooutil.tree_title";

/// Metadata key for the JSON branch-kind map.
pub const META_KEY_BRANCH_KINDS: &str = "rooutil.branch_kinds";

// ---------------------------------------------------------------------------
// Element conversions
// ---------------------------------------------------------------------------

/// Scalar types with a direct Arrow representation.
trait ArrowElement: BranchValue {
    fn data_type() -> DataType;

    fn to_array(values: &[Self]) -> ArrayRef;

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>>;
}

fn wrong_type(name: &str, expected: &DataType, array: &dyn Array) -> Error {
    Error::Validation(format!(
        "column '{name}' has wrong type: expected {expected}, got {}",
        array.data_type()
    ))
}

impl ArrowElement for i32 {
    fn data_type() -> DataType {
        DataType::Int32
    }

    fn to_array(values: &[Self]) -> ArrayRef {
        Arc::new(Int32Array::from(values.to_vec()))
    }

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>> {
        let arr = array
            .as_primitive_opt::<Int32Type>()
            .ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
        Ok(arr.iter().map(Option::unwrap_or_default).collect())
    }
}

impl ArrowElement for bool {
    fn data_type() -> DataType {
        DataType::Boolean
    }

    fn to_array(values: &[Self]) -> ArrayRef {
        Arc::new(BooleanArray::from(values.to_vec()))
    }

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>> {
        let arr =
            array.as_boolean_opt().ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
        Ok(arr.iter().map(Option::unwrap_or_default).collect())
    }
}

impl ArrowElement for f32 {
    fn data_type() -> DataType {
        DataType::Float32
    }

    fn to_array(values: &[Self]) -> ArrayRef {
        Arc::new(Float32Array::from(values.to_vec()))
    }

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>> {
        let arr = array
            .as_primitive_opt::<Float32Type>()
            .ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
        Ok(arr.iter().map(Option::unwrap_or_default).collect())
    }
}

impl ArrowElement for u64 {
    fn data_type() -> DataType {
        DataType::UInt64
    }

    fn to_array(values: &[Self]) -> ArrayRef {
        Arc::new(UInt64Array::from(values.to_vec()))
    }

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>> {
        let arr = array
            .as_primitive_opt::<UInt64Type>()
            .ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
        Ok(arr.iter().map(Option::unwrap_or_default).collect())
    }
}

impl ArrowElement for String {
    fn data_type() -> DataType {
        DataType::Utf8
    }

    fn to_array(values: &[Self]) -> ArrayRef {
        Arc::new(StringArray::from_iter_values(values))
    }

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>> {
        let arr = array
            .as_string_opt::<i32>()
            .ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
        Ok(arr.iter().map(|s| s.unwrap_or_default().to_string()).collect())
    }
}

impl ArrowElement for Bits {
    fn data_type() -> DataType {
        DataType::Binary
    }

    fn to_array(values: &[Self]) -> ArrayRef {
        Arc::new(BinaryArray::from_iter_values(values.iter().map(Bits::to_bytes)))
    }

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>> {
        let arr = array
            .as_binary_opt::<i32>()
            .ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
        Ok(arr.iter().map(|b| Bits::from_bytes(b.unwrap_or_default())).collect())
    }
}

fn lv_fields() -> Fields {
    ["px", "py", "pz", "e"].into_iter().map(|n| Field::new(n, DataType::Float32, false)).collect()
}

impl ArrowElement for Lv {
    fn data_type() -> DataType {
        DataType::Struct(lv_fields())
    }

    fn to_array(values: &[Self]) -> ArrayRef {
        let components: [fn(&Lv) -> f32; 4] = [|v| v.px, |v| v.py, |v| v.pz, |v| v.e];
        let children: Vec<(Arc<Field>, ArrayRef)> = lv_fields()
            .iter()
            .zip(components)
            .map(|(field, get)| {
                let arr: ArrayRef =
                    Arc::new(Float32Array::from_iter_values(values.iter().map(get)));
                (field.clone(), arr)
            })
            .collect();
        Arc::new(StructArray::from(children))
    }

    fn from_array(array: &dyn Array, name: &str) -> Result<Vec<Self>> {
        let arr =
            array.as_struct_opt().ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
        let mut parts = Vec::with_capacity(4);
        for comp in ["px", "py", "pz", "e"] {
            let child = arr
                .column_by_name(comp)
                .ok_or_else(|| wrong_type(name, &Self::data_type(), array))?;
            parts.push(f32::from_array(child.as_ref(), name)?);
        }
        Ok((0..arr.len())
            .map(|i| Lv::new(parts[0][i], parts[1][i], parts[2][i], parts[3][i]))
            .collect())
    }
}

fn list_data_type<T: ArrowElement>() -> DataType {
    DataType::List(Arc::new(Field::new_list_field(T::data_type(), false)))
}

fn to_list_array<T: ArrowElement>(rows: &[Vec<T>]) -> Result<ArrayRef> {
    let flat: Vec<T> = rows.iter().flatten().cloned().collect();
    let offsets = OffsetBuffer::from_lengths(rows.iter().map(Vec::len));
    let field = Arc::new(Field::new_list_field(T::data_type(), false));
    Ok(Arc::new(ListArray::try_new(field, offsets, T::to_array(&flat), None)?))
}

fn from_list_array<T: ArrowElement>(array: &dyn Array, name: &str) -> Result<Vec<Vec<T>>> {
    let list = array
        .as_list_opt::<i32>()
        .ok_or_else(|| wrong_type(name, &list_data_type::<T>(), array))?;
    let flat = T::from_array(list.values().as_ref(), name)?;
    Ok(list
        .value_offsets()
        .windows(2)
        .map(|w| flat[w[0] as usize..w[1] as usize].to_vec())
        .collect())
}

// ---------------------------------------------------------------------------
// Columns <-> arrays
// ---------------------------------------------------------------------------

fn arrow_type(kind: BranchKind) -> DataType {
    match kind {
        BranchKind::Int => i32::data_type(),
        BranchKind::Bool => bool::data_type(),
        BranchKind::Float => f32::data_type(),
        BranchKind::String => String::data_type(),
        BranchKind::Lv => Lv::data_type(),
        BranchKind::Bits => Bits::data_type(),
        BranchKind::ULong => u64::data_type(),
        BranchKind::VecInt => list_data_type::<i32>(),
        BranchKind::VecBool => list_data_type::<bool>(),
        BranchKind::VecFloat => list_data_type::<f32>(),
        BranchKind::VecString => list_data_type::<String>(),
        BranchKind::VecLv => list_data_type::<Lv>(),
    }
}

fn column_to_array(data: &ColumnData) -> Result<ArrayRef> {
    Ok(match data {
        ColumnData::Int(v) => i32::to_array(v),
        ColumnData::Bool(v) => bool::to_array(v),
        ColumnData::Float(v) => f32::to_array(v),
        ColumnData::String(v) => String::to_array(v),
        ColumnData::Lv(v) => Lv::to_array(v),
        ColumnData::Bits(v) => Bits::to_array(v),
        ColumnData::ULong(v) => u64::to_array(v),
        ColumnData::VecInt(v) => to_list_array(v)?,
        ColumnData::VecBool(v) => to_list_array(v)?,
        ColumnData::VecFloat(v) => to_list_array(v)?,
        ColumnData::VecString(v) => to_list_array(v)?,
        ColumnData::VecLv(v) => to_list_array(v)?,
    })
}

fn array_to_column(kind: BranchKind, array: &dyn Array, name: &str) -> Result<ColumnData> {
    Ok(match kind {
        BranchKind::Int => ColumnData::Int(i32::from_array(array, name)?),
        BranchKind::Bool => ColumnData::Bool(bool::from_array(array, name)?),
        BranchKind::Float => ColumnData::Float(f32::from_array(array, name)?),
        BranchKind::String => ColumnData::String(String::from_array(array, name)?),
        BranchKind::Lv => ColumnData::Lv(Lv::from_array(array, name)?),
        BranchKind::Bits => ColumnData::Bits(Bits::from_array(array, name)?),
        BranchKind::ULong => ColumnData::ULong(u64::from_array(array, name)?),
        BranchKind::VecInt => ColumnData::VecInt(from_list_array(array, name)?),
        BranchKind::VecBool => ColumnData::VecBool(from_list_array(array, name)?),
        BranchKind::VecFloat => ColumnData::VecFloat(from_list_array(array, name)?),
        BranchKind::VecString => ColumnData::VecString(from_list_array(array, name)?),
        BranchKind::VecLv => ColumnData::VecLv(from_list_array(array, name)?),
    })
}

/// Branch kind for an Arrow type, when the file carries no kind metadata.
fn infer_kind(data_type: &DataType) -> Option<BranchKind> {
    let scalar = |dt: &DataType| {
        BranchKind::ALL.into_iter().filter(|k| !k.is_vector()).find(|&k| arrow_type(k) == *dt)
    };
    match data_type {
        DataType::List(item) => {
            let elem = scalar(item.data_type())?;
            BranchKind::ALL.into_iter().find(|k| k.is_vector() && k.element() == elem)
        }
        dt => scalar(dt),
    }
}

// ---------------------------------------------------------------------------
// Tree <-> RecordBatch
// ---------------------------------------------------------------------------

/// Build an Arrow [`RecordBatch`] holding every entry of `tree`.
pub fn tree_to_record_batch(tree: &Tree) -> Result<RecordBatch> {
    let kinds: HashMap<&str, BranchKind> =
        tree.columns().iter().map(|c| (c.name.as_str(), c.kind())).collect();
    let metadata = HashMap::from([
        (META_KEY_TREE_NAME.to_string(), tree.name().to_string()),
        (META_KEY_TREE_TITLE.to_string(), tree.title().to_string()),
        (META_KEY_BRANCH_KINDS.to_string(), serde_json::to_string(&kinds)?),
    ]);

    let fields: Vec<Field> =
        tree.columns().iter().map(|c| Field::new(&c.name, arrow_type(c.kind()), false)).collect();
    let schema = Arc::new(Schema::new(fields).with_metadata(metadata));

    let arrays: Vec<ArrayRef> =
        tree.columns().iter().map(|c| column_to_array(&c.data)).collect::<Result<_>>()?;
    let options = RecordBatchOptions::new().with_row_count(Some(tree.entries() as usize));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

/// Rebuild a [`Tree`] from record batches sharing `schema`.
pub fn record_batches_to_tree(schema: &Arc<Schema>, batches: &[RecordBatch]) -> Result<Tree> {
    let meta = schema.metadata();
    let kinds: HashMap<String, BranchKind> = match meta.get(META_KEY_BRANCH_KINDS) {
        Some(json) => serde_json::from_str(json)?,
        None => HashMap::new(),
    };
    let name = meta.get(META_KEY_TREE_NAME).cloned().unwrap_or_else(|| "t".to_string());
    let title = meta.get(META_KEY_TREE_TITLE).cloned().unwrap_or_default();

    let batch = arrow::compute::concat_batches(schema, batches)?;

    let mut columns = Vec::with_capacity(schema.fields().len());
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let kind = match kinds.get(field.name()) {
            Some(&k) => k,
            None => {
                let k = infer_kind(field.data_type()).ok_or_else(|| {
                    Error::Validation(format!(
                        "column '{}' has unsupported type {}",
                        field.name(),
                        field.data_type()
                    ))
                })?;
                warn!(column = %field.name(), kind = %k, "branch kind inferred from Arrow type");
                k
            }
        };
        let data = array_to_column(kind, array.as_ref(), field.name())?;
        columns.push(Column { name: field.name().clone(), data });
    }

    Tree::from_columns(name, title, columns)
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn writer_properties(config: &TreeConfig) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(config.compression.to_parquet())
        .set_max_row_group_size(config.max_row_group_size.max(1))
        .build()
}

fn write_batch<W: std::io::Write + Send>(
    sink: W,
    tree: &Tree,
    config: &TreeConfig,
) -> Result<()> {
    if tree.columns().is_empty() {
        return Err(Error::Validation(format!("tree '{}' has no branches to write", tree.name())));
    }
    let batch = tree_to_record_batch(tree)?;
    let mut writer = ArrowWriter::try_new(sink, batch.schema(), Some(writer_properties(config)))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Write `tree` to a Parquet file.
pub fn write_tree_parquet(tree: &Tree, path: &Path, config: &TreeConfig) -> Result<()> {
    let file = File::create(path)?;
    write_batch(file, tree, config)?;
    debug!(path = %path.display(), entries = tree.entries(), "tree written");
    Ok(())
}

/// Write `tree` to Parquet bytes in memory.
pub fn write_tree_parquet_bytes(tree: &Tree, config: &TreeConfig) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_batch(&mut buf, tree, config)?;
    Ok(buf)
}

/// Read a tree from a Parquet file.
pub fn read_tree_parquet(path: &Path) -> Result<Tree> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let batches = builder.build()?.collect::<std::result::Result<Vec<_>, _>>()?;
    let tree = record_batches_to_tree(&schema, &batches)?;
    debug!(path = %path.display(), entries = tree.entries(), "tree read");
    Ok(tree)
}

/// Read a tree from Parquet bytes in memory.
pub fn read_tree_parquet_bytes(data: &[u8]) -> Result<Tree> {
    let buf = bytes::Bytes::copy_from_slice(data);
    let builder = ParquetRecordBatchReaderBuilder::try_new(buf)?;
    let schema = builder.schema().clone();
    let batches = builder.build()?.collect::<std::result::Result<Vec<_>, _>>()?;
    record_batches_to_tree(&schema, &batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Tree {
        let cols = vec![
            Column { name: "run".into(), data: ColumnData::ULong(vec![1, 1, 2]) },
            Column { name: "njet".into(), data: ColumnData::Int(vec![2, 0, 1]) },
            Column {
                name: "jets".into(),
                data: ColumnData::VecLv(vec![
                    vec![Lv::new(1.0, 2.0, 3.0, 4.0), Lv::new(0.5, 0.0, 0.0, 1.0)],
                    vec![],
                    vec![Lv::new(-1.0, 0.0, 2.0, 3.0)],
                ]),
            },
            Column {
                name: "trig".into(),
                data: ColumnData::Bits(vec![
                    [0usize, 5].into_iter().collect(),
                    Bits::new(),
                    [70usize].into_iter().collect(),
                ]),
            },
        ];
        Tree::from_columns("events", "sample", cols).unwrap()
    }

    #[test]
    fn record_batch_schema() {
        let batch = tree_to_record_batch(&sample_tree()).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 4);
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::UInt64);
        assert!(matches!(schema.field(2).data_type(), DataType::List(_)));
        assert_eq!(schema.metadata()[META_KEY_TREE_NAME], "events");
        assert!(schema.metadata()[META_KEY_BRANCH_KINDS].contains("\"vec_lv\""));
    }

    #[test]
    fn record_batch_roundtrip_preserves_columns() {
        let tree = sample_tree();
        let batch = tree_to_record_batch(&tree).unwrap();
        let back = record_batches_to_tree(&batch.schema(), &[batch]).unwrap();
        assert_eq!(back.name(), "events");
        assert_eq!(back.title(), "sample");
        assert_eq!(back.columns(), tree.columns());
    }

    #[test]
    fn kinds_inferred_without_metadata() {
        let tree = sample_tree();
        let batch = tree_to_record_batch(&tree).unwrap();
        let bare = Arc::new(Schema::new(batch.schema().fields().clone()));
        let batch = RecordBatch::try_new(bare.clone(), batch.columns().to_vec()).unwrap();
        let back = record_batches_to_tree(&bare, &[batch]).unwrap();
        assert_eq!(back.name(), "t");
        assert_eq!(back.kind_of("jets"), Some(BranchKind::VecLv));
        assert_eq!(back.kind_of("trig"), Some(BranchKind::Bits));
        assert_eq!(back.columns(), tree.columns());
    }

    #[test]
    fn infer_every_kind() {
        for kind in BranchKind::ALL {
            assert_eq!(infer_kind(&arrow_type(kind)), Some(kind));
        }
        assert_eq!(infer_kind(&DataType::Float64), None);
    }

    #[test]
    fn wrong_arrow_type_rejected() {
        let arr: ArrayRef = Arc::new(Float32Array::from(vec![1.0]));
        let err = array_to_column(BranchKind::Int, arr.as_ref(), "x").unwrap_err();
        assert!(err.to_string().contains("column 'x' has wrong type"));
    }

    #[test]
    fn empty_tree_not_written() {
        let tree = Tree::new("empty", "");
        let err = write_tree_parquet_bytes(&tree, &TreeConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn parquet_bytes_roundtrip() {
        let tree = sample_tree();
        let bytes = write_tree_parquet_bytes(&tree, &TreeConfig::default()).unwrap();
        assert!(!bytes.is_empty());
        let back = read_tree_parquet_bytes(&bytes).unwrap();
        assert_eq!(back.entries(), 3);
        assert_eq!(back.columns(), tree.columns());
    }

    #[test]
    fn zstd_parquet_roundtrip() {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        use crate::config::Compression;

        let tree = sample_tree();
        let mut config = TreeConfig::default().with_compression(Compression::Zstd);
        config.max_row_group_size = 2;
        let data = write_tree_parquet_bytes(&tree, &config).unwrap();

        let reader = SerializedFileReader::new(bytes::Bytes::from(data.clone())).unwrap();
        let meta = reader.metadata();
        assert_eq!(meta.num_row_groups(), 2);
        for rg in meta.row_groups() {
            for col in rg.columns() {
                assert!(matches!(col.compression(), parquet::basic::Compression::ZSTD(_)));
            }
        }

        let back = read_tree_parquet_bytes(&data).unwrap();
        assert_eq!(back.entries(), 3);
        assert_eq!(back.columns(), tree.columns());
    }
}
