use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use common::partition::bucket_for;
use common::{
    AssignRequest, Assignment, CompletionReport, CoordinatorClient, Endpoint, TaskKind, WordCount,
};
use coordinator::{server, Coordinator, CoordinatorConfig};
use tokio::{sync::oneshot, task::JoinHandle};
use worker::WorkerConfig;

struct Cluster {
    coordinator: Coordinator,
    endpoint: Endpoint,
    stop: oneshot::Sender<()>,
    server: JoinHandle<anyhow::Result<()>>,
}

async fn start_cluster(dir: &Path, inputs: Vec<String>, n_reduce: u32, timeout: Duration) -> Cluster {
    let coordinator = Coordinator::new(
        inputs,
        n_reduce,
        CoordinatorConfig {
            task_timeout: timeout,
            max_attempts: None,
        },
    )
    .unwrap();

    let endpoint = Endpoint::Unix(dir.join("coordinator.sock"));
    let bound = server::bind(&endpoint).await.unwrap();
    let (stop, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(bound.serve(coordinator.clone(), async {
        let _ = rx.await;
    }));

    Cluster {
        coordinator,
        endpoint,
        stop,
        server,
    }
}

fn write_inputs(dir: &Path, files: &[(&str, &str)]) -> Vec<String> {
    files
        .iter()
        .map(|(name, text)| {
            let path = dir.join(name);
            fs::write(&path, text).unwrap();
            path.to_string_lossy().to_string()
        })
        .collect()
}

fn worker_config(endpoint: &Endpoint, work_dir: &Path) -> WorkerConfig {
    WorkerConfig {
        endpoint: endpoint.clone(),
        work_dir: work_dir.to_path_buf(),
        poll_interval: Duration::from_millis(20),
    }
}

/// Todas las líneas de todas las salidas, ordenadas.
fn all_output_lines(work_dir: &Path, n_reduce: u32) -> Vec<String> {
    let mut lines: Vec<String> = (0..n_reduce)
        .flat_map(|r| {
            let path = work_dir.join(format!("mr-out-{}", r));
            fs::read_to_string(path)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    lines.sort();
    lines
}

async fn run_worker(cfg: WorkerConfig) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(30), worker::run(Arc::new(WordCount), cfg))
        .await
        .expect("el worker no terminó a tiempo")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wordcount_con_dos_workers() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir: PathBuf = dir.path().join("out");
    fs::create_dir_all(&work_dir).unwrap();

    let inputs = write_inputs(dir.path(), &[("a.txt", "the cat"), ("b.txt", "the dog")]);
    let cluster = start_cluster(dir.path(), inputs, 2, Duration::from_secs(10)).await;

    let w1 = tokio::spawn(run_worker(worker_config(&cluster.endpoint, &work_dir)));
    let w2 = tokio::spawn(run_worker(worker_config(&cluster.endpoint, &work_dir)));
    w1.await.unwrap().unwrap();
    w2.await.unwrap().unwrap();

    assert!(cluster.coordinator.done());
    assert_eq!(
        all_output_lines(&work_dir, 2),
        vec!["cat 1", "dog 1", "the 2"]
    );

    // "the" quedó en el bucket que elige el hash, y sólo ahí
    let the_bucket = bucket_for("the", 2);
    let the_file = fs::read_to_string(work_dir.join(format!("mr-out-{}", the_bucket))).unwrap();
    assert!(the_file.lines().any(|l| l == "the 2"));
    let other = fs::read_to_string(work_dir.join(format!("mr-out-{}", 1 - the_bucket))).unwrap();
    assert!(!other.lines().any(|l| l.starts_with("the ")));

    // cada salida ordenada por clave
    for r in 0..2 {
        let content = fs::read_to_string(work_dir.join(format!("mr-out-{}", r))).unwrap();
        let keys: Vec<&str> = content.lines().filter_map(|l| l.split(' ').next()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    cluster.stop.send(()).unwrap();
    cluster.server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_caido_se_reasigna_tras_el_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir: PathBuf = dir.path().join("out");
    fs::create_dir_all(&work_dir).unwrap();

    let inputs = write_inputs(dir.path(), &[("a.txt", "the cat"), ("b.txt", "the dog")]);
    let source_a = inputs[0].clone();
    let cluster = start_cluster(dir.path(), inputs, 2, Duration::from_millis(300)).await;

    // un worker toma el map 0 y muere sin reportar
    let client = CoordinatorClient::new(cluster.endpoint.clone());
    let crashed = client
        .assign(&AssignRequest {
            worker_id: "caido".to_string(),
        })
        .await
        .unwrap();
    let Assignment::Map { index, epoch, ref source, .. } = crashed else {
        panic!("esperaba un map, vino {crashed:?}");
    };
    assert_eq!(index, 0);
    assert_eq!(source, &source_a);

    // dejó basura a medio escribir (nunca renombrada)
    fs::write(work_dir.join(".mr-tmp-caido"), "{\"key\":\"the\",\"va").unwrap();

    run_worker(worker_config(&cluster.endpoint, &work_dir))
        .await
        .unwrap();

    assert!(cluster.coordinator.done());
    let map0 = cluster.coordinator.task(TaskKind::Map, 0).unwrap();
    assert!(map0.epoch >= 2, "el map 0 se tuvo que reasignar");
    assert_eq!(map0.source.as_deref(), Some(source_a.as_str()));
    assert!(cluster.coordinator.progress().reassignments >= 1);

    assert_eq!(
        all_output_lines(&work_dir, 2),
        vec!["cat 1", "dog 1", "the 2"]
    );

    // el reporte tardío del worker caído no descuenta nada
    let ack = client
        .report(&CompletionReport {
            kind: TaskKind::Map,
            index,
            epoch,
        })
        .await
        .unwrap();
    assert!(!ack.accepted);
    let progress = client.status().await.unwrap();
    assert_eq!(progress.map_remaining, 0);
    assert_eq!(progress.reduce_remaining, 0);

    cluster.stop.send(()).unwrap();
    cluster.server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn todos_los_workers_salen_con_ok_cuando_el_coordinador_se_apaga_solo() {
    let dir = tempfile::tempdir().unwrap();
    let work_dir: PathBuf = dir.path().join("out");
    fs::create_dir_all(&work_dir).unwrap();

    let inputs = write_inputs(dir.path(), &[("a.txt", "uno dos uno")]);
    let coordinator = Coordinator::new(inputs, 1, CoordinatorConfig::default()).unwrap();

    // misma política de apagado que el binario del coordinador
    let sock = dir.path().join("c.sock");
    let endpoint = Endpoint::Unix(sock.clone());
    let bound = server::bind(&endpoint).await.unwrap();
    let server = tokio::spawn(bound.serve(
        coordinator.clone(),
        server::linger_after_finished(
            coordinator.clone(),
            Duration::from_millis(50),
            Duration::from_millis(800),
        ),
    ));

    let mut cfg = worker_config(&endpoint, &work_dir);
    cfg.poll_interval = Duration::from_millis(200);
    let workers: Vec<_> = (0..3)
        .map(|_| tokio::spawn(run_worker(cfg.clone())))
        .collect();

    for w in workers {
        w.await.unwrap().expect("el worker debía recibir Finished");
    }
    assert!(coordinator.done());
    assert_eq!(all_output_lines(&work_dir, 1), vec!["dos 1", "uno 2"]);

    server.await.unwrap().unwrap();
    assert!(!sock.exists());
}
