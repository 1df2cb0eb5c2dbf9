use anyhow::{anyhow, Context};
use arrow_array::{Array, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, Table};

use evidex_core::config::RemoteSettings;
use evidex_core::error::{Error, Result};
use evidex_core::traits::VectorIndexer;
use evidex_core::types::{matches_filter, ChunkId, MetaFilter, Metadata, SearchHit, SourceKind};

use crate::flat::check_batch;
use crate::schema::{to_record_batch, ID_COLUMN, METADATA_COLUMN};

fn backend(e: anyhow::Error) -> Error {
	Error::Backend(format!("{e:#}"))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("result batch lacks string column '{}'", name))
}

fn id_predicate(ids: &[ChunkId]) -> String {
	let quoted: Vec<String> = ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect();
	format!("{} IN ({})", ID_COLUMN, quoted.join(", "))
}

/// Encodes an owner id into table-name-safe characters. ASCII alphanumerics
/// pass through; anything else, `_` included, becomes `_` plus six hex
/// digits, so distinct owners never share a table.
pub fn owner_namespace(owner_id: &str) -> String {
	let mut out = String::with_capacity(owner_id.len());
	for c in owner_id.chars() {
		if c.is_ascii_alphanumeric() {
			out.push(c);
		} else {
			out.push_str(&format!("_{:06x}", c as u32));
		}
	}
	out
}

/// LanceDB-backed vector store for one owner. Vectors of width `d` live in
/// the table `{table}_{owner}_d{d}`; a width change empties the owner's old
/// table and moves on. Other owners' tables are never touched.
pub struct LanceBackend {
	db: Connection,
	base_table: String,
	dim: Option<usize>,
	rows: usize,
	candidate_multiplier: usize,
}

impl LanceBackend {
	pub async fn connect(settings: &RemoteSettings, owner_id: &str, candidate_multiplier: usize) -> anyhow::Result<Self> {
		let mut builder = connect(&settings.uri);
		for (key, value) in &settings.storage_options {
			builder = builder.storage_option(key, value);
		}
		let db = builder.execute().await.with_context(|| format!("connecting to {}", settings.uri))?;
		let base_table = format!("{}_{}", settings.table, owner_namespace(owner_id));
		tracing::info!(uri = %settings.uri, table = %base_table, owner = owner_id, "lancedb backend connected");
		Ok(Self {
			db,
			base_table,
			dim: None,
			rows: 0,
			candidate_multiplier: candidate_multiplier.max(1),
		})
	}

	fn table_name(&self, dim: usize) -> String {
		format!("{}_d{}", self.base_table, dim)
	}

	async fn open_table(&self, name: &str) -> anyhow::Result<Option<Table>> {
		if self.db.table_names().execute().await?.iter().any(|t| t == name) {
			Ok(Some(self.db.open_table(name).execute().await?))
		} else {
			Ok(None)
		}
	}

	/// Deletes every row of this owner's `{table}_{owner}_d*` tables.
	async fn truncate_all(&self) -> anyhow::Result<()> {
		let prefix = format!("{}_d", self.base_table);
		for name in self.db.table_names().execute().await? {
			if name.strip_prefix(&prefix).is_some_and(|rest| rest.parse::<usize>().is_ok()) {
				self.db.open_table(&name).execute().await?.delete("true").await?;
			}
		}
		Ok(())
	}

	async fn insert_inner(&mut self, width: usize, vectors: &[Vec<f32>], ids: &[ChunkId], metadata: &[Metadata]) -> anyhow::Result<()> {
		if self.dim != Some(width) {
			if let Some(old) = self.dim {
				tracing::warn!(from = old, to = width, "vector width changed, switching lancedb table");
			}
			// stale rows from a previous width or process
			self.truncate_all().await?;
			self.dim = Some(width);
			self.rows = 0;
		}
		let name = self.table_name(width);
		let batch = to_record_batch(width, vectors, ids, metadata)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));

		// upsert semantics: drop earlier rows with the same ids
		match self.open_table(&name).await? {
			Some(table) => {
				table.delete(&id_predicate(ids)).await?;
				table.add(reader).execute().await?;
			}
			None => {
				self.db.create_table(&name, reader).execute().await?;
			}
		}
		self.rows = self.count().await?;
		Ok(())
	}

	async fn count(&self) -> anyhow::Result<usize> {
		let Some(dim) = self.dim else { return Ok(0) };
		match self.open_table(&self.table_name(dim)).await? {
			Some(table) => Ok(table.count_rows(None).await?),
			None => Ok(0),
		}
	}

	async fn search_inner(&self, dim: usize, query: &[f32], k: usize, filter: Option<&MetaFilter>) -> anyhow::Result<Vec<SearchHit>> {
		let Some(table) = self.open_table(&self.table_name(dim)).await? else { return Ok(Vec::new()) };
		let pool = if filter.is_some() { k.saturating_mul(self.candidate_multiplier) } else { k };
		let mut stream = table.vector_search(query.to_vec())?.limit(pool).execute().await?;

		let mut hits: Vec<(f32, SearchHit)> = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			let ids = string_column(&batch, ID_COLUMN)?;
			let metas = string_column(&batch, METADATA_COLUMN)?;
			let distances = batch
				.column_by_name("_distance")
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| anyhow!("result batch lacks _distance"))?;
			for i in 0..batch.num_rows() {
				if let Some(f) = filter {
					let meta: Metadata = serde_json::from_str(metas.value(i))?;
					if !matches_filter(&meta, f) {
						continue;
					}
				}
				let d = if distances.is_null(i) { f32::MAX } else { distances.value(i) };
				hits.push((d, SearchHit::new(ids.value(i), 1.0 / (1.0 + d), SourceKind::Vector)));
			}
		}
		hits.sort_by(|a, b| a.0.total_cmp(&b.0));
		Ok(hits.into_iter().take(k).map(|(_, h)| h).collect())
	}
}

#[async_trait]
impl VectorIndexer for LanceBackend {
	fn dim(&self) -> Option<usize> {
		self.dim
	}

	fn len(&self) -> usize {
		self.rows
	}

	async fn insert(&mut self, vectors: Vec<Vec<f32>>, ids: Vec<ChunkId>, metadata: Vec<Metadata>) -> Result<()> {
		let Some(width) = check_batch(&vectors, &ids, &metadata)? else { return Ok(()) };
		self.insert_inner(width, &vectors, &ids, &metadata).await.map_err(backend)
	}

	async fn search(&self, query: &[f32], k: usize, filter: Option<&MetaFilter>) -> Result<Vec<SearchHit>> {
		let Some(dim) = self.dim else { return Ok(Vec::new()) };
		if k == 0 {
			return Ok(Vec::new());
		}
		if query.len() != dim {
			return Err(Error::Dimension { expected: dim, got: query.len() });
		}
		self.search_inner(dim, query, k, filter).await.map_err(backend)
	}

	/// Native delete on the current table.
	async fn delete(&mut self, ids: &[ChunkId]) -> Result<()> {
		let Some(dim) = self.dim else { return Ok(()) };
		if ids.is_empty() {
			return Ok(());
		}
		let name = self.table_name(dim);
		let outcome: anyhow::Result<()> = async {
			if let Some(table) = self.open_table(&name).await? {
				table.delete(&id_predicate(ids)).await?;
			}
			Ok(())
		}
		.await;
		outcome.map_err(backend)?;
		self.rows = self.count().await.map_err(backend)?;
		Ok(())
	}

	async fn clear(&mut self) -> Result<()> {
		self.truncate_all().await.map_err(backend)?;
		self.rows = 0;
		Ok(())
	}
}
