use crate::app::KeyValue;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a de 32 bits con el bit de signo apagado.
///
/// Tiene que ser estable entre procesos y reinicios: una re-ejecución de la
/// misma tarea map debe mandar cada clave al mismo bucket.
pub fn ihash(key: &str) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for b in key.as_bytes() {
        h ^= u32::from(*b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h & 0x7fff_ffff
}

/// Bucket de reduce para `key`. `partitions` tiene que ser > 0.
pub fn bucket_for(key: &str, partitions: u32) -> u32 {
    debug_assert!(partitions > 0, "partitions debe ser > 0");
    ihash(key) % partitions.max(1)
}

/// Reparte la salida del map en `partitions` buckets, conservando el orden
/// de emisión dentro de cada uno. Siempre devuelve `partitions` buckets,
/// aunque alguno quede vacío.
pub fn partition(pairs: Vec<KeyValue>, partitions: u32) -> Vec<Vec<KeyValue>> {
    let mut buckets: Vec<Vec<KeyValue>> = (0..partitions.max(1)).map(|_| Vec::new()).collect();
    for kv in pairs {
        let b = bucket_for(&kv.key, partitions) as usize;
        buckets[b].push(kv);
    }
    buckets
}

/// Ordena por clave (estable) y agrupa las corridas de claves iguales.
///
/// Los valores de una misma clave quedan en el orden en que llegaron, así que
/// para la misma entrada el resultado es siempre el mismo.
pub fn group_by_key(mut pairs: Vec<KeyValue>) -> Vec<(String, Vec<String>)> {
    pairs.sort_by(|a, b| a.key.cmp(&b.key));

    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for KeyValue { key, value } in pairs {
        match groups.last_mut() {
            Some((last, values)) if *last == key => values.push(value),
            _ => groups.push((key, vec![value])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihash_coincide_con_fnv1a_conocido() {
        // valores de referencia de FNV-1a 32 bits
        assert_eq!(ihash(""), 0x811c_9dc5 & 0x7fff_ffff);
        assert_eq!(ihash("a"), 0xe40c_292c & 0x7fff_ffff);
        assert_eq!(ihash("foobar"), 0xbf9c_f968 & 0x7fff_ffff);
    }

    #[test]
    fn bucket_for_retorna_id_en_rango_y_es_determinista() {
        for n in [1, 2, 3, 10] {
            for key in ["a", "b", "the", "xyz", "otro"] {
                let b = bucket_for(key, n);
                assert!(b < n);
                assert_eq!(b, bucket_for(key, n));
            }
        }
    }

    #[test]
    fn partition_devuelve_todos_los_buckets_aunque_esten_vacios() {
        let pairs = vec![KeyValue::new("a", "1")];
        let buckets = partition(pairs, 4);

        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), 1);
        assert_eq!(buckets[bucket_for("a", 4) as usize][0].key, "a");
    }

    #[test]
    fn partition_manda_claves_iguales_al_mismo_bucket() {
        let pairs = vec![
            KeyValue::new("the", "1"),
            KeyValue::new("cat", "1"),
            KeyValue::new("the", "1"),
        ];
        let buckets = partition(pairs, 2);

        let the_bucket = bucket_for("the", 2) as usize;
        let count = buckets[the_bucket].iter().filter(|kv| kv.key == "the").count();
        assert_eq!(count, 2);
    }

    #[test]
    fn group_by_key_agrupa_y_ordena() {
        let pairs = vec![
            KeyValue::new("b", "1"),
            KeyValue::new("a", "x"),
            KeyValue::new("b", "2"),
            KeyValue::new("a", "y"),
        ];

        let groups = group_by_key(pairs);
        assert_eq!(
            groups,
            vec![
                ("a".to_string(), vec!["x".to_string(), "y".to_string()]),
                ("b".to_string(), vec!["1".to_string(), "2".to_string()]),
            ]
        );
    }

    #[test]
    fn group_by_key_con_entrada_vacia() {
        assert!(group_by_key(Vec::new()).is_empty());
    }
}
