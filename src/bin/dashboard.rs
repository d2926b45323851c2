use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_reports::client::api::DEFAULT_API_URL;
use helpdesk_reports::client::validation::{resolve_departments, validate_new_report, validate_registration};
use helpdesk_reports::client::{ApiClient, Dashboard, FieldEdit, Poller, Session, SessionStore};
use helpdesk_reports::models::{LoginRequest, NewReport, Priority, RegisterRequest, Report, Status, DEFAULT_ROSTER};
use helpdesk_reports::reports::filter::FilterParams;
use helpdesk_reports::reports::transfer::{export_filename, FileFormat};
use helpdesk_reports::reports::ReportFilter;

#[derive(Parser, Debug)]
#[command(name = "helpdesk-dashboard", about = "Dashboard client for the helpdesk report service")]
struct Cli {
    /// Base URL of the report service
    #[arg(long, global = true, env = "HELPDESK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Where the signed-in user is remembered
    #[arg(long, global = true, env = "HELPDESK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Seconds between refreshes in `watch`
    #[arg(long, global = true, env = "POLL_INTERVAL_SECS", default_value_t = 30)]
    poll_interval: u64,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 15)]
    timeout: u64,

    /// Staff used to fill in a missing assignee
    #[arg(long, global = true, env = "ASSIGNEE_ROSTER", value_delimiter = ',')]
    roster: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Date range: todos, hoy, ayer, estaSemana, semanaPasada, ultimos7, ultimos30,
    /// mes, mesPasado, trimestre, trimestrePasado, añoActual, añoPasado or a year
    #[arg(long)]
    fecha: Option<String>,
    #[arg(long)]
    prioridad: Option<String>,
    #[arg(long)]
    tipo: Option<String>,
    /// Free-text search
    #[arg(long)]
    q: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> Result<ReportFilter> {
        let params = FilterParams {
            fecha: self.fecha.clone(),
            prioridad: self.prioridad.clone(),
            tipo: self.tipo.clone(),
            q: self.q.clone(),
        };
        Ok(ReportFilter::try_from(&params)?)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the report table
    List(FilterArgs),
    /// Print the dashboard aggregates as JSON
    Stats(FilterArgs),
    /// Download the filtered reports
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "csv")]
        format: FileFormat,
        /// Defaults to reportes_municipales_<date>.<ext>
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create reports from a .csv or .json file
    Import { path: PathBuf },
    /// File a new report
    Create(CreateArgs),
    /// Change fields of an existing report
    Update(UpdateArgs),
    Delete { id: String },
    Register {
        #[arg(long)]
        nombre: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "usuario")]
        rol: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Keep the table refreshed until Ctrl+C
    Watch(FilterArgs),
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Repeat for several departments; "Otro" needs --otro
    #[arg(long = "departamento", required = true)]
    departamentos: Vec<String>,
    #[arg(long)]
    otro: Option<String>,
    #[arg(long)]
    descripcion: String,
    #[arg(long)]
    tipo: String,
    /// Defaults to the signed-in user's name
    #[arg(long)]
    quien: Option<String>,
    #[arg(long, value_parser = parse_priority, default_value = "Baja")]
    prioridad: Priority,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    telefono: Option<String>,
    /// Image to attach; repeat up to 10 times
    #[arg(long = "imagen")]
    imagenes: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    id: String,
    #[arg(long, value_parser = parse_status)]
    status: Option<Status>,
    #[arg(long, value_parser = parse_priority)]
    prioridad: Option<Priority>,
    #[arg(long = "departamento")]
    departamentos: Vec<String>,
    #[arg(long)]
    descripcion: Option<String>,
    #[arg(long)]
    tipo: Option<String>,
    #[arg(long)]
    quien: Option<String>,
}

impl UpdateArgs {
    fn edits(&self) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        if let Some(status) = self.status {
            edits.push(FieldEdit::Status(status));
        }
        if let Some(prioridad) = self.prioridad {
            edits.push(FieldEdit::Prioridad(prioridad));
        }
        if !self.departamentos.is_empty() {
            edits.push(FieldEdit::Departamento(self.departamentos.clone()));
        }
        if let Some(text) = &self.descripcion {
            edits.push(FieldEdit::Descripcion(text.clone()));
        }
        if let Some(text) = &self.tipo {
            edits.push(FieldEdit::TipoProblema(text.clone()));
        }
        if let Some(text) = &self.quien {
            edits.push(FieldEdit::QuienReporta(text.clone()));
        }
        edits
    }
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| format!("prioridad desconocida '{}'", value))
}

fn parse_status(value: &str) -> Result<Status, String> {
    Status::parse(value).ok_or_else(|| format!("status desconocido '{}'", value))
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_reports=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let roster = if cli.roster.is_empty() {
        DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect()
    } else {
        cli.roster.clone()
    };
    let api = Arc::new(ApiClient::new(&cli.api_url, Duration::from_secs(cli.timeout), roster)?);
    let sessions = SessionStore::new(cli.session_file.clone().unwrap_or_else(SessionStore::default_path));
    let dashboard = Arc::new(Dashboard::new(api.clone()));
    tracing::debug!("Using report service at {}", api.base_url());

    match cli.command {
        Command::List(args) => {
            let filter = args.filter()?;
            dashboard.reload().await?;
            let shown = dashboard.view(&filter, &Local::now()).await;
            print_table(&shown);
        }
        Command::Stats(args) => {
            let filter = args.filter()?;
            dashboard.reload().await?;
            let stats = dashboard.stats(&filter, &Local::now()).await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Export { filter, format, output } => {
            let filter = filter.filter()?;
            dashboard.reload().await?;
            let now = Local::now();
            let bytes = dashboard.export(&filter, &now, format).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(export_filename(now.date_naive(), format)));
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("Exportado a {}", path.display());
        }
        Command::Import { path } => {
            sessions.require()?;
            let format = FileFormat::from_path(&path)?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            let summary = dashboard.import(&bytes, format).await?;
            println!("{}", summary.feedback());
            for error in &summary.errors {
                println!("  - {}", error);
            }
        }
        Command::Create(args) => {
            let session = sessions.require()?;
            let report = NewReport {
                departamento: resolve_departments(&args.departamentos, args.otro.as_deref())?,
                descripcion: args.descripcion,
                tipo_problema: args.tipo,
                quien_reporta: args.quien.unwrap_or(session.usuario.nombre),
                prioridad: args.prioridad,
                email: args.email,
                telefono: args.telefono,
                ..Default::default()
            };
            validate_new_report(&report)?;
            let id = if args.imagenes.is_empty() {
                dashboard.create(&report).await?
            } else {
                let created = api.create_report_with_images(&report, &args.imagenes).await;
                if let Err(e) = dashboard.reload().await {
                    tracing::warn!("Reload after mutation failed: {}", e);
                }
                created?.id
            };
            println!("Reporte guardado correctamente: {}", id);
        }
        Command::Update(args) => {
            sessions.require()?;
            let edits = args.edits();
            if edits.is_empty() {
                bail!("nada que actualizar; indica al menos un campo");
            }
            for edit in edits {
                dashboard.edit(&args.id, edit).await;
            }
            dashboard.commit(&args.id).await?;
            println!("Reporte actualizado correctamente");
        }
        Command::Delete { id } => {
            sessions.require()?;
            dashboard.delete(&id).await?;
            println!("Reporte eliminado correctamente");
        }
        Command::Register {
            nombre,
            email,
            password,
            rol,
        } => {
            let request = RegisterRequest {
                nombre,
                email,
                password,
                rol,
            };
            validate_registration(&request)?;
            let response = api.register(&request).await?;
            println!("{} ({})", response.message, response.usuario.email);
        }
        Command::Login { email, password } => {
            let response = api.login(&LoginRequest { email, password }).await?;
            sessions.save(&Session::new(response.usuario.clone()))?;
            println!("{}: {} ({})", response.message, response.usuario.nombre, response.usuario.rol);
        }
        Command::Logout => {
            if sessions.clear()? {
                println!("Sesión cerrada");
            } else {
                println!("No había sesión activa");
            }
        }
        Command::Watch(args) => {
            let filter = args.filter()?;
            watch(dashboard, filter, Duration::from_secs(cli.poll_interval.max(1))).await?;
        }
    }
    Ok(())
}

async fn watch(dashboard: Arc<Dashboard>, filter: ReportFilter, every: Duration) -> Result<()> {
    let mut ticks = dashboard.subscribe();
    let mut poller = Poller::start(dashboard.clone(), every);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = ticks.changed() => {
                if changed.is_err() {
                    break;
                }
                let now = Local::now();
                let shown = dashboard.view(&filter, &now).await;
                println!("--- {} ---", now.format("%Y-%m-%d %H:%M:%S"));
                print_table(&shown);
            }
        }
    }
    poller.stop().await;
    Ok(())
}

fn print_table(reports: &[Report]) {
    if reports.is_empty() {
        println!("No hay reportes");
        return;
    }
    for report in reports {
        let local: DateTime<Local> = report.timestamp.with_timezone(&Local);
        println!(
            "{:<22} {}  {:<8} {:<10} {:<28} {:<30} {}",
            report.id,
            local.format("%Y-%m-%d %H:%M"),
            report.prioridad.as_str(),
            report.status.as_str(),
            report.tipo_problema,
            report.departamento.join(", "),
            report.asignado_a
        );
    }
    println!("{} reporte(s)", reports.len());
}
