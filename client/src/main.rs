use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::{CoordinatorClient, Endpoint, JobStatus};

/// Igual que en el worker:
/// - --endpoint si se pasa
/// - si no, MR_COORDINATOR
/// - si no, el socket por defecto del usuario
fn resolve_endpoint(arg: Option<Endpoint>) -> Result<Endpoint> {
    match arg {
        Some(ep) => Ok(ep),
        None => Endpoint::from_env().context("MR_COORDINATOR inválido"),
    }
}

#[derive(Parser)]
#[command(name = "mrctl")]
#[command(about = "CLI simple para hablar con el coordinador")]
struct Cli {
    /// unix:/ruta/al.sock o tcp://host:puerto
    #[arg(long, global = true)]
    endpoint: Option<Endpoint>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prueba de vida: manda X y espera X+1
    Ping {
        #[arg(value_name = "X", default_value_t = 99)]
        x: i64,
    },
    /// Progreso del job en curso
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let endpoint = resolve_endpoint(cli.endpoint)?;
    let client = CoordinatorClient::new(endpoint.clone());

    match cli.command {
        Commands::Ping { x } => {
            let y = client
                .echo(x)
                .await
                .with_context(|| format!("no responde el coordinador en {}", endpoint))?;
            println!("echo {} -> {}", x, y);
            if y != x.wrapping_add(1) {
                println!("respuesta inesperada (esperaba {})", x.wrapping_add(1));
            }
        }
        Commands::Status => {
            let p = client
                .status()
                .await
                .with_context(|| format!("no responde el coordinador en {}", endpoint))?;

            println!("Job:");
            println!("  estado: {:?}", p.status);
            println!("  maps pendientes: {}/{}", p.map_remaining, p.map_total);
            println!("  reduces pendientes: {}/{}", p.reduce_remaining, p.reduce_total);
            println!("  reasignaciones: {}", p.reassignments);
            println!("  inicio: {}", p.started_at);
            match (p.status, p.finished_at) {
                (JobStatus::Running, _) | (_, None) => {}
                (_, Some(fin)) => println!("  fin: {}", fin),
            }
        }
    }

    Ok(())
}
