use crate::app::{KeyValue, MapReduceApp};

/// WordCount: emite (palabra, "1") por cada palabra y suma en el reduce.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCount;

/// Limpia un token: sólo alfanumérico y '_', en minúscula.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

impl MapReduceApp for WordCount {
    fn map(&self, _filename: &str, contents: &str) -> Vec<KeyValue> {
        contents
            .split_whitespace()
            .map(normalize)
            .filter(|w| !w.is_empty())
            .map(|w| KeyValue::new(w, "1"))
            .collect()
    }

    fn reduce(&self, _key: &str, values: &[String]) -> String {
        // cada valor es un conteo parcial; los no numéricos cuentan como 1
        values
            .iter()
            .map(|v| v.trim().parse::<u64>().unwrap_or(1))
            .sum::<u64>()
            .to_string()
    }
}
