use serde::{Deserialize, Serialize};

/// Par clave/valor que emite `map` y consume `reduce`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Las dos funciones de usuario que ejecuta el worker.
///
/// El worker las trata como cajas negras: no sabe qué hacen, sólo las llama
/// desde un hilo de bloqueo.
pub trait MapReduceApp: Send + Sync + 'static {
    /// `filename` es el archivo de entrada y `contents` su contenido completo.
    fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue>;

    /// Todos los valores de `key`, en el orden en que quedaron tras ordenar.
    fn reduce(&self, key: &str, values: &[String]) -> String;
}
