use anyhow::Result;
use arrow_array::{types::Float32Type, FixedSizeListArray, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

use evidex_core::types::{ChunkId, Metadata};

pub const ID_COLUMN: &str = "id";
pub const METADATA_COLUMN: &str = "metadata";
pub const VECTOR_COLUMN: &str = "vector";

/// `id`, JSON-encoded `metadata`, and a fixed-width `vector` column.
pub fn build_arrow_schema(dim: usize) -> Result<Arc<Schema>> {
	let width = i32::try_from(dim)?;
	Ok(Arc::new(Schema::new(vec![
		Field::new(ID_COLUMN, DataType::Utf8, false),
		Field::new(METADATA_COLUMN, DataType::Utf8, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), width), true),
	])))
}

pub fn to_record_batch(dim: usize, vectors: &[Vec<f32>], ids: &[ChunkId], metadata: &[Metadata]) -> Result<RecordBatch> {
	let schema = build_arrow_schema(dim)?;
	let width = i32::try_from(dim)?;
	let meta_json = metadata.iter().map(serde_json::to_string).collect::<Result<Vec<_>, _>>()?;
	let rows = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
	let batch = RecordBatch::try_new(schema, vec![
		Arc::new(StringArray::from(ids.to_vec())),
		Arc::new(StringArray::from(meta_json)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(rows, width)),
	])?;
	Ok(batch)
}
