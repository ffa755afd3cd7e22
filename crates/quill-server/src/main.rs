use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use quill_patch::{apply_patch, compute_diff, parse_patch};
use quill_protocol::ChapterId;
use quill_server::store::ChapterRecord;
use quill_server::telemetry::init_tracing;
use quill_server::{app_state, open_store, routes, ChapterStore, FileStore, ServerConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("quill")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Chapter autosave patch server and patch tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the patch server")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("bind")
                        .long("bind")
                        .help("Listen address, overrides the config file"),
                )
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Chapter data directory, overrides the config file"),
                )
                .arg(
                    Arg::new("log-json")
                        .long("log-json")
                        .action(ArgAction::SetTrue)
                        .help("Emit logs as JSON"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Print the patch turning one file into another")
                .arg(Arg::new("old").required(true).value_parser(value_parser!(PathBuf)))
                .arg(Arg::new("new").required(true).value_parser(value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply a patch file to a base file and print the result")
                .arg(Arg::new("patch").required(true).value_parser(value_parser!(PathBuf)))
                .arg(Arg::new("base").required(true).value_parser(value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("seed")
                .about("Create an empty chapter and print its id")
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Chapter data directory"),
                )
                .arg(
                    Arg::new("title")
                        .long("title")
                        .default_value("Untitled chapter")
                        .help("Chapter title"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("serve", args)) => serve(args).await,
        Some(("diff", args)) => {
            let old = read_arg(args, "old")?;
            let new = read_arg(args, "new")?;
            print!("{}", compute_diff(&old, &new));
            Ok(())
        }
        Some(("apply", args)) => {
            let patch = parse_patch(&read_arg(args, "patch")?).context("invalid patch file")?;
            let base = read_arg(args, "base")?;
            let outcome = apply_patch(&patch, &base);
            print!("{}", outcome.text);
            if !outcome.is_complete() {
                bail!("hunks {:?} did not apply", outcome.failed_hunks());
            }
            Ok(())
        }
        Some(("seed", args)) => {
            let dir = path_arg(args, "data-dir")?;
            let title = args
                .get_one::<String>("title")
                .map_or("Untitled chapter", String::as_str);
            let store = FileStore::open(dir).await?;
            let id = ChapterId::new();
            store.put(ChapterRecord::new(id, title)).await?;
            println!("{id}");
            Ok(())
        }
        _ => unreachable!("subcommand_required is set"),
    }
}

async fn serve(args: &ArgMatches) -> anyhow::Result<()> {
    init_tracing(args.get_flag("log-json"))?;

    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.get_one::<String>("bind") {
        config = config.with_bind(bind.clone());
    }
    if let Some(dir) = args.get_one::<PathBuf>("data-dir") {
        config = config.with_data_dir(dir.clone());
    }

    let addr = config.bind_addr()?;
    let store = open_store(&config).await?;
    let routes = routes::routes(app_state(store, &config));

    let (bound, server) = warp::serve(routes).try_bind_with_graceful_shutdown(addr, async {
        let _ = tokio::signal::ctrl_c().await;
    })?;
    info!(%bound, "quill server listening");
    server.await;
    info!("quill server stopped");
    Ok(())
}

fn path_arg(args: &ArgMatches, name: &str) -> anyhow::Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("missing argument {name}"))
}

fn read_arg(args: &ArgMatches, name: &str) -> anyhow::Result<String> {
    let path = path_arg(args, name)?;
    std::fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))
}
