// hiproc - save a shell command once, recall it anywhere
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{bail, Context};
use hiproc_lib::{
    config::Config,
    core::{Recorder, Retriever, Searcher},
    db::{
        Command, CommandFilter, NewCommand, NewExecution, QuickSave, RecallByNameRequest,
        RecallRequest, SuggestionsRequest,
    },
    intelligence::{Analyzer, ContextDetector, SuggestionEngine},
    telemetry, Database, RecallError,
};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        match e.downcast_ref::<RecallError>() {
            Some(recall) => eprintln!("Error: {}", recall.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Grab whatever the user typed
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "version" | "-v" | "--version" => {
            println!("hiproc v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        "help" | "-h" | "--help" => {
            print_usage();
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load().context("loading configuration")?;
    telemetry::init_tracing(&config.log_filter);

    let db = Arc::new(
        Database::new(&config.database_path)
            .await
            .with_context(|| format!("opening {}", config.database_path.display()))?,
    );
    let caller = Caller::from_env();

    let result = match command {
        "save" => handle_save(&db, &caller, rest).await,
        "recall" => handle_recall(&db, &caller, rest).await,
        "run" => handle_run(&db, &caller, rest).await,
        "exec" => handle_exec(&db, &caller, rest).await,
        "show" => handle_show(&db, &caller, rest).await,
        "edit" => handle_edit(&db, &caller, rest).await,
        "rename" => handle_rename(&db, &caller, rest).await,
        "delete" => handle_delete(&db, &caller, rest).await,
        "list" => handle_list(&db, &caller, rest).await,
        "namespaces" => handle_namespaces(&db).await,
        "find" => handle_find(&db, &caller, rest).await,
        "suggest" => handle_suggest(&db, &caller, &config, rest).await,
        "similar" => handle_similar(&db, &config, rest).await,
        "context" => handle_context(&db, &caller, rest).await,
        "analytics" => handle_analytics(&db, &caller, &config, rest).await,
        "status" => handle_status(&db).await,
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            Ok(())
        }
    };

    db.close().await;
    result
}

/// Who is asking, and from where
struct Caller {
    user: Option<String>,
    hostname: Option<String>,
    cwd: Option<String>,
}

impl Caller {
    fn from_env() -> Self {
        let user = env::var("USER").ok().filter(|u| !u.is_empty());
        let hostname = env::var("HOSTNAME")
            .ok()
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());
        let cwd = env::current_dir()
            .ok()
            .map(|p| p.to_string_lossy().into_owned());

        Self {
            user,
            hostname,
            cwd,
        }
    }

    /// Ownership checks need a concrete name
    fn require_user(&self) -> anyhow::Result<&str> {
        self.user
            .as_deref()
            .context("USER is not set; cannot check command ownership")
    }

    fn execution(&self, command_id: i64, method: &str) -> NewExecution {
        let mut exec = NewExecution::new(command_id);
        exec.user = self.user.clone();
        exec.hostname = self.hostname.clone();
        exec.cwd = self.cwd.clone();
        exec.execution_method = method.to_string();
        exec
    }
}

/// Split args into positionals and `--flag value` pairs
///
/// Flags listed in `switches` take no value. Everything after `--` is
/// positional.
fn parse_args<'a>(
    args: &'a [String],
    switches: &[&str],
) -> (Vec<&'a str>, HashMap<&'a str, &'a str>) {
    let mut positional = Vec::new();
    let mut flags = HashMap::new();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            positional.extend(args[i + 1..].iter().map(String::as_str));
            break;
        }
        if arg.starts_with("--") {
            if switches.contains(&arg) {
                flags.insert(arg, "");
            } else if let Some(value) = args.get(i + 1) {
                flags.insert(arg, value.as_str());
                i += 1;
            }
        } else {
            positional.push(arg);
        }
        i += 1;
    }

    (positional, flags)
}

fn parse_id(arg: Option<&&str>) -> anyhow::Result<i64> {
    let raw = arg.context("missing command id")?;
    raw.parse()
        .with_context(|| format!("'{}' is not a command id", raw))
}

fn parse_limit(flags: &HashMap<&str, &str>, key: &str, default: usize) -> anyhow::Result<usize> {
    match flags.get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} expects a number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

fn owned(value: Option<&&str>) -> Option<String> {
    value.map(|v| v.to_string())
}

async fn handle_save(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, flags) = parse_args(args, &[]);
    if parts.is_empty() {
        bail!("usage: hiproc save [--name N] [--namespace NS] [--scope S] <command...>");
    }

    let command_string = parts.join(" ");
    let recorder = Recorder::new(Arc::clone(db));

    let saved = match (flags.get("--name"), flags.get("--namespace")) {
        (Some(name), Some(namespace)) => {
            let mut cmd = NewCommand::new(command_string, *name, *namespace);
            cmd.user = caller.user.clone();
            cmd.hostname = caller.hostname.clone();
            cmd.cwd = caller.cwd.clone();
            if let Some(scope) = flags.get("--scope") {
                cmd.scope = scope.to_string();
            }
            recorder.save(&cmd).await?
        }
        (name, namespace) => {
            recorder
                .quick_save(&QuickSave {
                    command_string,
                    name: owned(name),
                    namespace: owned(namespace),
                    user: caller.user.clone(),
                    cwd: caller.cwd.clone(),
                    hostname: caller.hostname.clone(),
                    scope: owned(flags.get("--scope")),
                })
                .await?
        }
    };

    let verb = if saved.is_new { "Saved" } else { "Already saved" };
    println!(
        "{} #{} {}/{}",
        verb, saved.command.id, saved.command.namespace, saved.command.name
    );
    Ok(())
}

async fn handle_recall(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, _) = parse_args(args, &[]);
    let (Some(namespace), Some(name)) = (parts.first(), parts.get(1)) else {
        bail!("usage: hiproc recall <namespace> <name>");
    };

    let retriever = Retriever::new(Arc::clone(db));
    let req = RecallRequest {
        name: name.to_string(),
        namespace: namespace.to_string(),
        user: caller.user.clone(),
        hostname: caller.hostname.clone(),
        cwd: caller.cwd.clone(),
    };

    let Some(cmd) = retriever.recall_command(&req).await? else {
        bail!("no command {}/{}", namespace, name);
    };

    record(db, caller, &cmd, "namespace").await?;
    println!("{}", cmd.command_string);
    Ok(())
}

async fn handle_run(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, flags) = parse_args(args, &[]);
    let Some(name) = parts.first() else {
        bail!("usage: hiproc run <name> [--namespace NS] [--scope S]");
    };

    let retriever = Retriever::new(Arc::clone(db));
    let req = RecallByNameRequest {
        name: name.to_string(),
        user: caller.user.clone(),
        hostname: caller.hostname.clone(),
        cwd: caller.cwd.clone(),
        namespace_hint: owned(flags.get("--namespace")),
        scope_hint: owned(flags.get("--scope")),
    };

    let Some(cmd) = retriever.recall_by_name(&req).await? else {
        bail!("no command named {}", name);
    };

    record(db, caller, &cmd, "name").await?;
    println!("{}", cmd.command_string);
    Ok(())
}

async fn handle_exec(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, _) = parse_args(args, &[]);
    let id = parse_id(parts.first())?;
    let user = caller.require_user()?;

    let retriever = Retriever::new(Arc::clone(db));
    let Some(cmd) = retriever.track_execution(id, user).await? else {
        bail!("no command #{}", id);
    };

    record(db, caller, &cmd, "id").await?;
    println!("{}", cmd.command_string);
    Ok(())
}

async fn record(db: &Arc<Database>, caller: &Caller, cmd: &Command, method: &str) -> anyhow::Result<()> {
    let recorder = Recorder::new(Arc::clone(db));
    recorder
        .record_execution(&caller.execution(cmd.id, method))
        .await?;
    Ok(())
}

async fn handle_show(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, _) = parse_args(args, &[]);
    let id = parse_id(parts.first())?;
    let user = caller.require_user()?;

    let retriever = Retriever::new(Arc::clone(db));
    let Some(cmd) = retriever.get_by_id(id, user).await? else {
        bail!("no command #{}", id);
    };

    println!("#{} {}/{}", cmd.id, cmd.namespace, cmd.name);
    println!("  command:   {}", cmd.command_string);
    println!("  scope:     {}", cmd.scope);
    println!("  owner:     {}", cmd.user.as_deref().unwrap_or("-"));
    println!("  host:      {}", cmd.hostname.as_deref().unwrap_or("-"));
    println!("  cwd:       {}", cmd.cwd.as_deref().unwrap_or("-"));
    println!("  used:      {} times", cmd.use_count);
    println!("  created:   {}", cmd.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(last) = cmd.last_used_at {
        println!("  last used: {}", last.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

async fn handle_edit(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, _) = parse_args(args, &[]);
    let id = parse_id(parts.first())?;
    let text = parts.get(1..).unwrap_or_default().join(" ");
    if text.trim().is_empty() {
        bail!("usage: hiproc edit <id> <command...>");
    }
    let user = caller.require_user()?;

    let retriever = Retriever::new(Arc::clone(db));
    match retriever.update_text(id, user, text.trim()).await? {
        Some(cmd) => println!("Updated #{}: {}", cmd.id, cmd.command_string),
        None => bail!("no command #{} owned by {}", id, user),
    }
    Ok(())
}

async fn handle_rename(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, _) = parse_args(args, &[]);
    let id = parse_id(parts.first())?;
    let (Some(name), Some(namespace)) = (parts.get(1), parts.get(2)) else {
        bail!("usage: hiproc rename <id> <name> <namespace>");
    };
    let user = caller.require_user()?;

    let retriever = Retriever::new(Arc::clone(db));
    match retriever.rename(id, user, name, namespace).await? {
        Some(cmd) => println!("Renamed #{} to {}/{}", cmd.id, cmd.namespace, cmd.name),
        None => bail!("no command #{} owned by {}", id, user),
    }
    Ok(())
}

async fn handle_delete(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, _) = parse_args(args, &[]);
    let id = parse_id(parts.first())?;
    let user = caller.require_user()?;

    let retriever = Retriever::new(Arc::clone(db));
    match retriever.delete(id, user).await? {
        Some(cmd) => println!("Deleted #{} {}/{}", cmd.id, cmd.namespace, cmd.name),
        None => bail!("no command #{} owned by {}", id, user),
    }
    Ok(())
}

async fn handle_list(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, flags) = parse_args(args, &["--mine"]);

    let user = if flags.contains_key("--mine") {
        Some(caller.require_user()?.to_string())
    } else {
        owned(flags.get("--user"))
    };
    let filter = CommandFilter {
        q: (!parts.is_empty()).then(|| parts.join(" ")),
        namespace: owned(flags.get("--namespace")),
        user,
        scope: owned(flags.get("--scope")),
    };

    let commands = db.list_commands(&filter).await?;
    if commands.is_empty() {
        println!("No commands found.");
        return Ok(());
    }
    print_commands(&commands);
    Ok(())
}

async fn handle_namespaces(db: &Arc<Database>) -> anyhow::Result<()> {
    for namespace in db.namespaces().await? {
        println!("{}", namespace);
    }
    Ok(())
}

async fn handle_find(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, flags) = parse_args(args, &[]);
    let limit = parse_limit(&flags, "--limit", 10)?;

    let searcher = Searcher::new(Arc::clone(db));
    let results = searcher
        .find(caller.user.as_deref(), &parts.join(" "), limit)
        .await?;

    if results.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for result in results {
        let cmd = &result.command;
        println!(
            "{:>5}  {:<28} {}",
            format!("#{}", cmd.id),
            format!("{}/{}", cmd.namespace, cmd.name),
            cmd.command_string
        );
    }
    Ok(())
}

async fn handle_suggest(
    db: &Arc<Database>,
    caller: &Caller,
    config: &Config,
    args: &[String],
) -> anyhow::Result<()> {
    let (_, flags) = parse_args(args, &[]);
    let limit = parse_limit(&flags, "--limit", config.suggestion_limit)?;

    let engine = SuggestionEngine::new(Arc::clone(db));
    let suggestions = engine
        .suggestions(&SuggestionsRequest {
            user: caller.user.clone(),
            hostname: caller.hostname.clone(),
            cwd: caller.cwd.clone(),
            limit,
        })
        .await?;

    if suggestions.is_empty() {
        println!("No suggestions available yet.");
        println!("Save and run a few commands to build up history!");
        return Ok(());
    }
    print_commands(&suggestions);
    Ok(())
}

async fn handle_similar(db: &Arc<Database>, config: &Config, args: &[String]) -> anyhow::Result<()> {
    let (parts, flags) = parse_args(args, &[]);
    let id = parse_id(parts.first())?;
    let limit = parse_limit(&flags, "--limit", config.similar_limit)?;

    let engine = SuggestionEngine::new(Arc::clone(db));
    let similar = engine.similar_to(id, limit).await?;
    if similar.is_empty() {
        println!("Nothing similar to #{}.", id);
        return Ok(());
    }
    print_commands(&similar);
    Ok(())
}

async fn handle_context(db: &Arc<Database>, caller: &Caller, args: &[String]) -> anyhow::Result<()> {
    let (parts, _) = parse_args(args, &[]);
    let directory = match parts.first() {
        Some(dir) => dir.to_string(),
        None => caller.cwd.clone().context("cannot determine current directory")?,
    };

    let detector = ContextDetector::new(Arc::clone(db));
    let context = detector
        .detect_project_context(&directory, caller.user.as_deref())
        .await?;

    println!(
        "namespace:  {}",
        context.detected_namespace.as_deref().unwrap_or("-")
    );
    println!("type:       {}", context.project_type.as_deref().unwrap_or("-"));
    println!("confidence: {}%", context.confidence_score);
    if !context.similar_commands.is_empty() {
        println!("commands:   {}", context.similar_commands.join(", "));
    }
    Ok(())
}

async fn handle_analytics(
    db: &Arc<Database>,
    caller: &Caller,
    config: &Config,
    args: &[String],
) -> anyhow::Result<()> {
    let (_, flags) = parse_args(args, &["--all"]);
    let days = match flags.get("--days") {
        Some(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("--days expects a number, got '{}'", raw))?,
        None => config.analytics_days,
    };
    let user = if flags.contains_key("--all") {
        None
    } else {
        caller.user.as_deref()
    };

    let analyzer = Analyzer::new(Arc::clone(db));
    let report = analyzer.analytics(user, days).await?;

    println!("{}", "=".repeat(60));
    println!("Execution analytics, last {} days", days);
    println!("{}", "=".repeat(60));
    println!("Total executions: {}", report.total_executions);
    println!("Unique commands:  {}", report.unique_commands);
    println!("Per day:          {:.2}", report.average_executions_per_day);

    if !report.most_used_commands.is_empty() {
        println!("\nMost executed:");
        for (i, usage) in report.most_used_commands.iter().enumerate() {
            println!(
                "  {:>2}. {}/{} ({})",
                i + 1,
                usage.namespace,
                usage.name,
                usage.execution_count
            );
        }
    }

    if !report.execution_methods.is_empty() {
        println!("\nBy method:");
        for method in &report.execution_methods {
            println!("  {:<12} {}", method.execution_method, method.count);
        }
    }
    Ok(())
}

async fn handle_status(db: &Arc<Database>) -> anyhow::Result<()> {
    let stats = db.stats().await?;

    println!("{}", "=".repeat(60));
    println!("hiproc status");
    println!("{}", "=".repeat(60));
    println!("Database:         {}", db.path().display());
    println!("Commands:         {}", stats.total_commands);
    println!("Executions:       {}", stats.total_executions);
    println!("Project contexts: {}", stats.total_project_contexts);
    println!("Namespaces:       {}", db.namespaces().await?.len());
    Ok(())
}

fn print_commands(commands: &[Command]) {
    for cmd in commands {
        println!(
            "{:>5}  {:<28} {:>4}x  {}",
            format!("#{}", cmd.id),
            format!("{}/{}", cmd.namespace, cmd.name),
            cmd.use_count,
            cmd.command_string
        );
    }
}

fn print_usage() {
    println!(
        r#"hiproc v{} - save shell commands once, recall them anywhere

USAGE:
    hiproc <COMMAND> [OPTIONS]

COMMANDS:
    save [--name N] [--namespace NS] [--scope S] <command...>
                               Save a command (name/namespace guessed if omitted)
    recall <namespace> <name>  Print the best match for namespace/name
    run <name> [--namespace NS] [--scope S]
                               Print the best match for a name in this context
    exec <id>                  Print a command by id and count the use
    show <id>                  Show a command's details
    edit <id> <command...>     Replace a command's text
    rename <id> <name> <ns>    Move a command to a new name/namespace
    delete <id>                Delete a command and its history
    list [query] [--namespace NS] [--user U] [--scope S] [--mine]
                               List saved commands
    namespaces                 List namespaces
    find <query> [--limit N]   Fuzzy-find commands you can see
    suggest [--limit N]        Suggestions for the current directory
    similar <id> [--limit N]   Commands similar to one
    context [dir]              Detect the project namespace of a directory
    analytics [--days N] [--all]
                               Execution statistics
    status                     Show database stats
    version                    Show version
    help                       Show this help

ENVIRONMENT:
    HIPROC_DB     Database file (default: ~/.hiproc/commands.db)
    HIPROC_LOG    Log filter (default: info)

EXAMPLES:
    hiproc save --name processes --namespace system top
    hiproc recall system processes
    eval "$(hiproc run deploy)"
"#,
        env!("CARGO_PKG_VERSION")
    );
}
