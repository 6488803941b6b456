use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::{NamedTempFile, PersistError};
use thiserror::Error;

use common::KeyValue;

/// Partición intermedia que produjo el map `map_index` para el bucket `reduce_index`.
pub fn intermediate_path(dir: &Path, map_index: u32, reduce_index: u32) -> PathBuf {
    dir.join(format!("mr-{}-{}.jsonl", map_index, reduce_index))
}

/// Salida final del bucket `reduce_index`.
pub fn output_path(dir: &Path, reduce_index: u32) -> PathBuf {
    dir.join(format!("mr-out-{}", reduce_index))
}

/// Escribe en un temporal del mismo directorio y lo renombra a `target`.
///
/// El rename es el punto de publicación: quien lea `target` ve el archivo
/// viejo, el nuevo completo, o nada. Si `write` falla el temporal se borra.
pub fn write_atomic<F>(target: &Path, write: F) -> Result<(), AtomicWriteError>
where
    F: FnOnce(&mut BufWriter<&File>) -> io::Result<()>,
{
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::with_prefix_in(".mr-tmp-", dir).map_err(AtomicWriteError::Write)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write(&mut writer).map_err(AtomicWriteError::Write)?;
        writer.flush().map_err(AtomicWriteError::Write)?;
    }
    tmp.as_file().sync_all().map_err(AtomicWriteError::Write)?;

    tmp.persist(target).map_err(AtomicWriteError::Publish)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    /// Falló la escritura del temporal; el destino no se tocó
    #[error("no se pudo escribir el temporal: {0}")]
    Write(#[source] io::Error),
    #[error("no se pudo renombrar el temporal: {0}")]
    Publish(#[source] PersistError),
}

/// Un registro JSON por línea.
pub fn encode_records<W: Write>(writer: &mut W, records: &[KeyValue]) -> io::Result<()> {
    for kv in records {
        serde_json::to_writer(&mut *writer, kv)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ReadPartitionError {
    #[error("no se pudo leer: {0}")]
    Open(#[source] io::Error),
    #[error("registro inválido en la línea {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Lee una partición intermedia completa. Un registro roto es error, no fin
/// de archivo.
pub fn read_partition(path: &Path) -> Result<Vec<KeyValue>, ReadPartitionError> {
    let file = File::open(path).map_err(ReadPartitionError::Open)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(ReadPartitionError::Open)?;
        if line.trim().is_empty() {
            continue;
        }
        let kv: KeyValue = serde_json::from_str(&line).map_err(|source| {
            ReadPartitionError::Decode {
                line: n + 1,
                source,
            }
        })?;
        out.push(kv);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn nombres_canonicos() {
        let dir = Path::new("/data/mr");
        assert_eq!(intermediate_path(dir, 3, 1), PathBuf::from("/data/mr/mr-3-1.jsonl"));
        assert_eq!(output_path(dir, 7), PathBuf::from("/data/mr/mr-out-7"));
    }

    #[test]
    fn write_atomic_publica_el_contenido_completo() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");

        write_atomic(&target, |w| w.write_all(b"hola\n")).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "hola\n");

        // una segunda publicación reemplaza a la primera
        write_atomic(&target, |w| w.write_all(b"chau\n")).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "chau\n");
    }

    #[test]
    fn write_atomic_con_error_no_deja_rastro() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");

        let res = write_atomic(&target, |w| {
            w.write_all(b"a medias")?;
            Err(io::Error::new(io::ErrorKind::Other, "se cayó el worker"))
        });

        assert!(matches!(res, Err(AtomicWriteError::Write(_))));
        assert!(!target.exists());
        // ni el temporal
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_atomic_no_pisa_un_destino_valido_si_falla() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        write_atomic(&target, |w| w.write_all(b"bueno\n")).unwrap();

        let _ = write_atomic(&target, |_| Err(io::Error::new(io::ErrorKind::Other, "x")));
        assert_eq!(fs::read_to_string(&target).unwrap(), "bueno\n");
    }

    #[test]
    fn read_partition_roundtrip_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mr-0-0.jsonl");
        let records = vec![KeyValue::new("a", "1"), KeyValue::new("b c", "2")];

        write_atomic(&path, |w| encode_records(w, &records)).unwrap();
        assert_eq!(read_partition(&path).unwrap(), records);
    }

    #[test]
    fn read_partition_falla_con_registro_roto() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roto.jsonl");
        fs::write(&path, "{\"key\":\"a\",\"value\":\"1\"}\n{\"key\":\"b\"").unwrap();

        match read_partition(&path) {
            Err(ReadPartitionError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("esperaba error de decodificación, vino {other:?}"),
        }
    }

    #[test]
    fn read_partition_inexistente() {
        let dir = tempfile::tempdir().unwrap();
        let res = read_partition(&dir.path().join("no-existe.jsonl"));
        assert!(matches!(res, Err(ReadPartitionError::Open(_))));
    }
}
