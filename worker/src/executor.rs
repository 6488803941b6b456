use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

use common::partition::{group_by_key, partition};
use common::{KeyValue, MapReduceApp};

use crate::storage::{
    encode_records, intermediate_path, output_path, read_partition, write_atomic,
    AtomicWriteError, ReadPartitionError,
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("no se pudo leer la entrada {path}: {source}")]
    ReadInput {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("falta o no se puede leer la partición {}: {source}", .path.display())]
    ReadPartition {
        path: PathBuf,
        #[source]
        source: ReadPartitionError,
    },
    #[error("no se pudo escribir la partición {}: {source}", .path.display())]
    WritePartition {
        path: PathBuf,
        #[source]
        source: AtomicWriteError,
    },
    #[error("no se pudo escribir la salida {}: {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: AtomicWriteError,
    },
    #[error("no se pudo publicar la salida {}: {source}", .path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: AtomicWriteError,
    },
    #[error("la tarea entró en pánico: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Sólo perder la salida final de un reduce tumba al worker; el resto
    /// aborta el intento y lo recupera el timeout del coordinador.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::Publish { .. })
    }
}

/// Ejecuta un map: lee `source`, aplica la función de usuario, reparte en
/// `partitions` buckets y publica un archivo por bucket (aunque esté vacío).
pub fn run_map<A>(
    app: &A,
    work_dir: &Path,
    map_index: u32,
    source: &str,
    partitions: u32,
) -> Result<usize, TaskError>
where
    A: MapReduceApp + ?Sized,
{
    let contents = fs::read_to_string(source).map_err(|e| TaskError::ReadInput {
        path: source.to_string(),
        source: e,
    })?;

    let pairs = app.map(source, &contents);
    let emitted = pairs.len();
    debug!("map {} emitió {} pares desde {}", map_index, emitted, source);

    for (bucket, records) in partition(pairs, partitions).into_iter().enumerate() {
        let path = intermediate_path(work_dir, map_index, bucket as u32);
        write_atomic(&path, |w| encode_records(w, &records))
            .map_err(|source| TaskError::WritePartition { path, source })?;
    }

    Ok(emitted)
}

/// Ejecuta un reduce: junta la partición `reduce_index` de cada uno de los
/// `map_count` maps, agrupa por clave y publica `mr-out-<reduce_index>`.
///
/// Si falta cualquier partición no se escribe nada.
pub fn run_reduce<A>(
    app: &A,
    work_dir: &Path,
    reduce_index: u32,
    map_count: u32,
) -> Result<usize, TaskError>
where
    A: MapReduceApp + ?Sized,
{
    let mut pairs: Vec<KeyValue> = Vec::new();
    for map_index in 0..map_count {
        let path = intermediate_path(work_dir, map_index, reduce_index);
        let mut records =
            read_partition(&path).map_err(|source| TaskError::ReadPartition { path, source })?;
        pairs.append(&mut records);
    }

    let groups = group_by_key(pairs);
    let keys = groups.len();

    let path = output_path(work_dir, reduce_index);
    write_atomic(&path, |w| {
        for (key, values) in &groups {
            let out = app.reduce(key, values);
            writeln!(w, "{} {}", key, out)?;
        }
        Ok(())
    })
    .map_err(|source| match source {
        AtomicWriteError::Publish(_) => TaskError::Publish { path, source },
        AtomicWriteError::Write(_) => TaskError::WriteOutput { path, source },
    })?;

    debug!("reduce {} escribió {} claves", reduce_index, keys);
    Ok(keys)
}
