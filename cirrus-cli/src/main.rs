mod manifest;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;

use cirrus_core::differ::{create_plan, find_changed_attributes};
use cirrus_core::effect::Effect;
use cirrus_core::interpreter::{EffectOutcome, Interpreter, InterpreterConfig};
use cirrus_core::plan::Plan;
use cirrus_core::provider::Provider;
use cirrus_core::resource::{ResourceId, State, Value, attributes_to_json};
use cirrus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema};
use cirrus_provider_ibm::IbmProvider;
use cirrus_state::{
    BackendConfig, LockInfo, ResourceState, StateBackend, StateFile, create_backend,
};

use manifest::{Manifest, Schemas};

const PROVIDER_NAME: &str = "ibm";

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(about = "Declarative IBM Cloud resource management", long_about = None)]
struct Cli {
    /// Path to the state file
    #[arg(long, global = true, default_value = "cirrus.state.json")]
    state: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest against the resource schemas
    Validate {
        /// Path to the manifest
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the manifest
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the manifest
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Destroy every resource recorded in state
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Evaluate the data sources of the manifest and print them as JSON
    Read {
        /// Path to the manifest
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Bring an existing remote object under management
    Import {
        /// Resource type (e.g., ibm_is_volume)
        resource_type: String,
        /// Name to record the resource under
        name: String,
        /// Remote identifier (e.g., r006-... or cloud_instance_id/dhcp_id)
        identifier: String,
    },
    /// Inspect or edit the state file
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// Remove a stale state lock
    ForceUnlock {
        /// ID of the lock to remove
        lock_id: String,
    },
    /// Print the schema of a resource or data source type
    Schema {
        /// Type to describe; lists all types when omitted
        resource_type: Option<String>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List resources recorded in state
    List,
    /// Forget a resource without deleting it remotely
    Rm {
        resource_type: String,
        name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let state_path = cli.state;
    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file, &state_path).await,
        Commands::Apply { file } => run_apply(&file, &state_path).await,
        Commands::Destroy { auto_approve } => run_destroy(&state_path, auto_approve).await,
        Commands::Read { file } => run_read(&file).await,
        Commands::Import {
            resource_type,
            name,
            identifier,
        } => run_import(&state_path, &resource_type, &name, &identifier).await,
        Commands::State { command } => run_state_command(&state_path, command).await,
        Commands::ForceUnlock { lock_id } => run_force_unlock(&state_path, &lock_id).await,
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "cirrus", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

// =============================================================================
// Shared helpers
// =============================================================================

fn get_provider() -> Result<IbmProvider, String> {
    IbmProvider::from_env().map_err(|e| format!("Failed to configure provider: {}", e))
}

fn load_manifest(file: &Path, schemas: &Schemas) -> Result<Manifest, String> {
    let manifest = Manifest::load(file)?;
    manifest.validate(schemas)?;
    Ok(manifest)
}

async fn open_backend(path: &Path) -> Result<Box<dyn StateBackend>, String> {
    create_backend(&BackendConfig::local(path.display().to_string()))
        .await
        .map_err(|e| format!("Failed to open state: {}", e))
}

async fn load_state(backend: &dyn StateBackend) -> Result<StateFile, String> {
    backend
        .read_state()
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| format!("Failed to read state: {}", e))
}

async fn save_state(backend: &dyn StateBackend, state: &mut StateFile) -> Result<(), String> {
    state.increment_serial();
    backend
        .write_state(state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

async fn acquire_lock(backend: &dyn StateBackend, operation: &str) -> Result<LockInfo, String> {
    backend
        .acquire_lock(operation)
        .await
        .map_err(|e| format!("Failed to lock state: {}", e))
}

/// How often a held lock is extended while effects run
const LOCK_RENEW_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Drive a locked operation, extending the lock every `every` until it finishes
async fn with_lock_renewal<T>(
    backend: &dyn StateBackend,
    lock: &LockInfo,
    every: Duration,
    operation: impl Future<Output = Result<T, String>>,
) -> Result<T, String> {
    tokio::pin!(operation);
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);

    loop {
        tokio::select! {
            result = &mut operation => return result,
            _ = ticker.tick() => match backend.renew_lock(lock).await {
                Ok(renewed) => log::debug!("Extended state lock {} until {}", renewed.id, renewed.expires),
                Err(e) => log::warn!("Failed to extend state lock {}: {}", lock.id, e),
            },
        }
    }
}

/// Release the lock, keeping the first error of the locked operation
async fn release_lock<T>(
    backend: &dyn StateBackend,
    lock: &LockInfo,
    result: Result<T, String>,
) -> Result<T, String> {
    if let Err(e) = backend.release_lock(lock).await {
        log::warn!("Failed to release state lock {}: {}", lock.id, e);
        if result.is_ok() {
            return Err(format!(
                "Failed to release state lock: {} (run `cirrus force-unlock {}`)",
                e, lock.id
            ));
        }
    }
    result
}

/// Read the current state of every resource recorded in state
///
/// Attributes recorded in state but not reported by the read are kept, so
/// that write-only inputs do not show up as changes.
async fn refresh_states(
    provider: &dyn Provider,
    state: &StateFile,
) -> Result<HashMap<ResourceId, State>, String> {
    let mut current_states = HashMap::new();

    for stored in &state.resources {
        let id = stored.resource_id();
        log::debug!("Refreshing {} ({})", id, stored.identifier);

        let current = provider
            .read(&id, Some(stored.identifier.as_str()))
            .await
            .map_err(|e| format!("Failed to read {}: {}", id, e))?;

        let current = if current.exists {
            merge_stored(current, stored)
        } else {
            log::info!("{} ({}) no longer exists", id, stored.identifier);
            current
        };
        current_states.insert(id, current);
    }

    Ok(current_states)
}

fn merge_stored(mut current: State, stored: &ResourceState) -> State {
    let recorded = stored.to_state();
    for (key, value) in recorded.attributes {
        current.attributes.entry(key).or_insert(value);
    }
    if current.identifier.is_none() {
        current.identifier = recorded.identifier;
    }
    current
}

/// Drop resources that disappeared remotely from state
fn prune_missing(
    state: &mut StateFile,
    current_states: &HashMap<ResourceId, State>,
) -> Vec<ResourceId> {
    let missing: Vec<ResourceId> = state
        .resources
        .iter()
        .map(ResourceState::resource_id)
        .filter(|id| current_states.get(id).is_some_and(|s| !s.exists))
        .collect();

    for id in &missing {
        state.remove_resource(&id.resource_type, &id.name);
    }
    missing
}

/// Diff the manifest against current state
///
/// Resources recorded in state but no longer declared are deleted, most
/// recently created first.
fn build_plan(
    manifest: &Manifest,
    current_states: &HashMap<ResourceId, State>,
    state: &StateFile,
    schemas: &Schemas,
) -> Plan {
    let mut plan = create_plan(&manifest.all(), current_states, &schemas.resources);

    let declared: HashSet<&ResourceId> = manifest.resources.iter().map(|r| &r.id).collect();
    for stored in state.resources.iter().rev() {
        let id = stored.resource_id();
        if declared.contains(&id) {
            continue;
        }
        if let Some(current) = current_states.get(&id)
            && current.exists
        {
            plan.add(Effect::Delete {
                id,
                identifier: stored.identifier.clone(),
                attributes: current.attributes.clone(),
            });
        }
    }

    plan
}

/// Plan deleting every resource in state, most recently created first
fn destroy_plan(state: &StateFile) -> Plan {
    let mut plan = Plan::new();
    for stored in state.resources.iter().rev() {
        plan.add(Effect::Delete {
            id: stored.resource_id(),
            identifier: stored.identifier.clone(),
            attributes: stored.to_state().attributes,
        });
    }
    plan
}

/// Record the outcome of a successful effect in state
fn record_outcome(state: &mut StateFile, effect: &Effect, outcome: &EffectOutcome) {
    let applied = match outcome {
        EffectOutcome::Created { state: applied }
        | EffectOutcome::Updated { state: applied }
        | EffectOutcome::Replaced { state: applied } => applied,
        EffectOutcome::Deleted { id } => {
            state.remove_resource(&id.resource_type, &id.name);
            return;
        }
        EffectOutcome::Read { .. } | EffectOutcome::Skipped { .. } => return,
    };

    let mut applied = applied.clone();
    match effect {
        Effect::Create(desired) => merge_desired(&mut applied, &desired.attributes),
        Effect::Update { from, to, .. } | Effect::Replace { from, to, .. } => {
            merge_desired(&mut applied, &to.attributes);
            if applied.identifier.is_none() && matches!(effect, Effect::Update { .. }) {
                applied.identifier = from.identifier.clone();
            }
        }
        _ => {}
    }

    match ResourceState::from_state(&applied, PROVIDER_NAME) {
        Some(record) => state.upsert_resource(record),
        None => log::warn!("{} returned no identifier, not recorded in state", applied.id),
    }
}

fn merge_desired(applied: &mut State, desired: &HashMap<String, Value>) {
    for (key, value) in desired {
        applied
            .attributes
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}

// =============================================================================
// Commands
// =============================================================================

fn run_validate(file: &Path) -> Result<(), String> {
    let schemas = Schemas::ibm();
    let manifest = Manifest::load(file)?;

    println!("{}", "Validating...".cyan());

    manifest.validate(&schemas)?;

    println!(
        "{}",
        format!("✓ {} blocks validated successfully.", manifest.len())
            .green()
            .bold()
    );

    for resource in &manifest.data {
        println!("  • data {}", resource.id);
    }
    for resource in &manifest.resources {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(file: &Path, state_path: &Path) -> Result<(), String> {
    let schemas = Schemas::ibm();
    let manifest = load_manifest(file, &schemas)?;
    let provider = get_provider()?;

    let backend = open_backend(state_path).await?;
    let state = load_state(&*backend).await?;
    let current_states = refresh_states(&provider, &state).await?;

    let plan = build_plan(&manifest, &current_states, &state, &schemas);
    print_plan(&plan, &schemas);
    Ok(())
}

async fn run_apply(file: &Path, state_path: &Path) -> Result<(), String> {
    let schemas = Schemas::ibm();
    let manifest = load_manifest(file, &schemas)?;
    let provider = get_provider()?;

    let backend = open_backend(state_path).await?;
    let lock = acquire_lock(&*backend, "apply").await?;
    let result = with_lock_renewal(
        &*backend,
        &lock,
        LOCK_RENEW_INTERVAL,
        apply_locked(&*backend, provider, &manifest, &schemas),
    )
    .await;
    release_lock(&*backend, &lock, result).await
}

async fn apply_locked(
    backend: &dyn StateBackend,
    provider: IbmProvider,
    manifest: &Manifest,
    schemas: &Schemas,
) -> Result<(), String> {
    let mut state = load_state(backend).await?;
    let current_states = refresh_states(&provider, &state).await?;

    let plan = build_plan(manifest, &current_states, &state, schemas);

    let pruned = prune_missing(&mut state, &current_states);
    for id in &pruned {
        println!("{} {} was deleted outside of cirrus", "!".yellow().bold(), id);
    }

    if plan.mutation_count() == 0 {
        if !pruned.is_empty() {
            save_state(backend, &mut state).await?;
        }
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan, schemas);
    println!();

    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let interpreter = Interpreter::new(provider);
    let result = interpreter.apply(&plan).await;

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(outcome) => {
                record_outcome(&mut state, effect, outcome);
                if effect.is_mutating() {
                    println!("  {} {}", "✓".green(), effect);
                }
            }
            Err(e) => println!("  {} {} - {}", "✗".red(), effect, e),
        }
    }

    let skipped = plan.effects().len() - result.outcomes.len();
    if skipped > 0 {
        println!("  {} {} remaining changes skipped", "-".yellow(), skipped);
    }

    save_state(backend, &mut state).await?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", plan.mutation_count())
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            result.success_count, result.failure_count
        ))
    }
}

async fn run_destroy(state_path: &Path, auto_approve: bool) -> Result<(), String> {
    let backend = open_backend(state_path).await?;
    let lock = acquire_lock(&*backend, "destroy").await?;
    let result = with_lock_renewal(
        &*backend,
        &lock,
        LOCK_RENEW_INTERVAL,
        destroy_locked(&*backend, auto_approve),
    )
    .await;
    release_lock(&*backend, &lock, result).await
}

async fn destroy_locked(backend: &dyn StateBackend, auto_approve: bool) -> Result<(), String> {
    let mut state = load_state(backend).await?;

    if state.resources.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    let plan = destroy_plan(&state);
    let provider = get_provider()?;

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        if let Effect::Delete { id, identifier, .. } = effect {
            println!("  {} {} ({})", "-".red().bold(), id, identifier.dimmed());
        }
    }
    println!();
    println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let interpreter = Interpreter::new(provider).with_config(InterpreterConfig {
        continue_on_error: true,
        ..Default::default()
    });
    let result = interpreter.apply(&plan).await;

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(outcome) => {
                record_outcome(&mut state, effect, outcome);
                println!("  {} {}", "✓".green(), effect);
            }
            Err(e) => println!("  {} {} - {}", "✗".red(), effect, e),
        }
    }

    save_state(backend, &mut state).await?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", result.success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            result.success_count, result.failure_count
        ))
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input.trim() == "yes")
}

async fn run_read(file: &Path) -> Result<(), String> {
    let schemas = Schemas::ibm();
    let manifest = load_manifest(file, &schemas)?;

    if manifest.data.is_empty() {
        println!("{}", "No data sources defined in the manifest.".yellow());
        return Ok(());
    }

    let provider = get_provider()?;
    let mut output = serde_json::Map::new();

    for resource in &manifest.data {
        let state = provider
            .read_data_source(resource)
            .await
            .map_err(|e| format!("Failed to read {}: {}", resource.id, e))?;
        output.insert(
            resource.id.to_string(),
            serde_json::json!({
                "identifier": state.identifier,
                "attributes": attributes_to_json(&state.attributes),
            }),
        );
    }

    let json = serde_json::to_string_pretty(&serde_json::Value::Object(output))
        .map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn run_import(
    state_path: &Path,
    resource_type: &str,
    name: &str,
    identifier: &str,
) -> Result<(), String> {
    let schemas = Schemas::ibm();
    if !schemas.resources.contains_key(resource_type) {
        return Err(format!("Unknown resource type: {}", resource_type));
    }
    let provider = get_provider()?;
    let id = ResourceId::new(resource_type, name);

    let backend = open_backend(state_path).await?;
    let lock = acquire_lock(&*backend, "import").await?;
    let result = import_locked(&*backend, &provider, &id, identifier).await;
    release_lock(&*backend, &lock, result).await?;

    println!(
        "{}",
        format!("Imported {} ({}).", id, identifier).green().bold()
    );
    Ok(())
}

async fn import_locked(
    backend: &dyn StateBackend,
    provider: &dyn Provider,
    id: &ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let mut state = load_state(backend).await?;

    if let Some(existing) = state.find_resource(&id.resource_type, &id.name) {
        return Err(format!(
            "{} is already managed as {}; remove it from state first",
            id, existing.identifier
        ));
    }

    let current = provider
        .read(id, Some(identifier))
        .await
        .map_err(|e| format!("Failed to read {}: {}", id, e))?;
    if !current.exists {
        return Err(format!(
            "Cannot import {}: no remote object with ID {}",
            id, identifier
        ));
    }

    let current = match current.identifier {
        Some(_) => current,
        None => current.with_identifier(identifier),
    };
    let record = ResourceState::from_state(&current, PROVIDER_NAME)
        .ok_or_else(|| format!("Cannot import {}: no identifier", id))?;

    state.upsert_resource(record);
    save_state(backend, &mut state).await
}

async fn run_state_command(state_path: &Path, command: StateCommands) -> Result<(), String> {
    let backend = open_backend(state_path).await?;

    match command {
        StateCommands::List => {
            let state = load_state(&*backend).await?;
            if state.resources.is_empty() {
                println!("{}", "No resources in state.".yellow());
            }
            for resource in &state.resources {
                println!(
                    "{}  {}",
                    resource.resource_id().to_string().cyan(),
                    resource.identifier
                );
            }
            Ok(())
        }
        StateCommands::Rm {
            resource_type,
            name,
        } => {
            let lock = acquire_lock(&*backend, "state rm").await?;
            let result = remove_locked(&*backend, &resource_type, &name).await;
            release_lock(&*backend, &lock, result).await?;
            println!(
                "{}",
                format!("Removed {}.{} from state.", resource_type, name).green()
            );
            Ok(())
        }
    }
}

async fn remove_locked(
    backend: &dyn StateBackend,
    resource_type: &str,
    name: &str,
) -> Result<(), String> {
    let mut state = load_state(backend).await?;
    if state.remove_resource(resource_type, name).is_none() {
        return Err(format!("{}.{} is not in state", resource_type, name));
    }
    save_state(backend, &mut state).await
}

async fn run_force_unlock(state_path: &Path, lock_id: &str) -> Result<(), String> {
    let backend = open_backend(state_path).await?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| format!("Failed to unlock state: {}", e))?;
    println!("{}", "State has been unlocked.".green().bold());
    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let schemas = Schemas::ibm();

    let Some(resource_type) = resource_type else {
        println!("{}", "Resources:".bold());
        for name in sorted_keys(&schemas.resources) {
            println!("  {}", name.cyan());
        }
        println!();
        println!("{}", "Data sources:".bold());
        for name in sorted_keys(&schemas.data_sources) {
            println!("  {}", name.cyan());
        }
        return Ok(());
    };

    let found: Vec<(&str, &ResourceSchema)> = [
        ("resource", schemas.resources.get(resource_type)),
        ("data source", schemas.data_sources.get(resource_type)),
    ]
    .into_iter()
    .filter_map(|(kind, schema)| schema.map(|s| (kind, s)))
    .collect();

    if found.is_empty() {
        return Err(format!("Unknown resource type: {}", resource_type));
    }

    for (kind, schema) in found {
        println!(
            "{} {}",
            schema.resource_type.cyan().bold(),
            format!("({})", kind).dimmed()
        );
        if let Some(description) = &schema.description {
            println!("  {}", description);
        }
        println!();
        print_attributes(&schema.attributes, 1);
        for group in &schema.exactly_one_of {
            println!("  exactly one of: {}", group.join(", "));
        }
        println!();
    }
    Ok(())
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&String> {
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    keys
}

fn print_attributes(attributes: &HashMap<String, AttributeSchema>, depth: usize) {
    let indent = "  ".repeat(depth);
    for name in sorted_keys(attributes) {
        let attr = &attributes[name];
        println!(
            "{}{}: {} {}",
            indent,
            name.bold(),
            attr.attr_type,
            attribute_flags(attr).dimmed()
        );
        if let Some(description) = &attr.description {
            println!("{}  {}", indent, description);
        }
        if let Some(block) = nested_block(&attr.attr_type) {
            print_attributes(&block.attributes, depth + 1);
        }
    }
}

fn nested_block(attr_type: &AttributeType) -> Option<&BlockSchema> {
    match attr_type {
        AttributeType::Block(block) => Some(block),
        AttributeType::List(inner) => nested_block(inner),
        _ => None,
    }
}

fn attribute_flags(attr: &AttributeSchema) -> String {
    let mut flags = vec![match (attr.required, attr.computed, attr.settable) {
        (true, _, _) => "required",
        (false, true, false) => "computed",
        (false, true, true) => "optional, computed",
        _ => "optional",
    }
    .to_string()];

    if attr.force_new {
        flags.push("forces replacement".to_string());
    }
    if attr.sensitive {
        flags.push("sensitive".to_string());
    }
    if let Some(default) = &attr.default {
        flags.push(format!("default: {}", format_value(default)));
    }

    format!("({})", flags.join(", "))
}

// =============================================================================
// Plan output
// =============================================================================

fn print_plan(plan: &Plan, schemas: &Schemas) {
    if plan.mutation_count() == 0 {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    let attr_prefix = "      ";

    for effect in plan.effects() {
        match effect {
            Effect::Read { resource } => {
                println!("  {} data {}", "<=".cyan().bold(), resource.id);
            }
            Effect::Create(r) => {
                println!("  {} {}", "+".green().bold(), r.id.to_string().bold());
                let schema = schemas.resources.get(&r.id.resource_type);
                for key in display_keys(&r.attributes) {
                    let value = format_attribute(schema, key, &r.attributes[key]);
                    println!("{}{}: {}", attr_prefix, key, value.green());
                }
            }
            Effect::Update { id, from, to } | Effect::Replace { id, from, to } => {
                let replace = matches!(effect, Effect::Replace { .. });
                let symbol = if replace {
                    "-/+".magenta().bold()
                } else {
                    "~".yellow().bold()
                };
                println!("  {} {}", symbol, id.to_string().bold());

                let schema = schemas.resources.get(&id.resource_type);
                for key in find_changed_attributes(&to.attributes, &from.attributes) {
                    let old = from
                        .attributes
                        .get(&key)
                        .map(|v| format_attribute(schema, &key, v))
                        .unwrap_or_else(|| "(none)".to_string());
                    let new = format_attribute(schema, &key, &to.attributes[&key]);
                    let forces = schema
                        .and_then(|s| s.attributes.get(&key))
                        .is_some_and(|a| a.force_new);
                    let note = if forces {
                        " (forces replacement)".magenta().to_string()
                    } else {
                        String::new()
                    };
                    println!("{}{}: {} → {}{}", attr_prefix, key, old.red(), new.green(), note);
                }
            }
            Effect::Delete { id, identifier, .. } => {
                println!("  {} {}", "-".red().bold(), id.to_string().bold());
                println!("{}{}: {}", attr_prefix, "identifier", identifier.red());
            }
        }
    }

    println!();
    let summary = plan.summary();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
}

/// Attribute keys in display order: `name` first, internal keys hidden
fn display_keys(attributes: &HashMap<String, Value>) -> Vec<&String> {
    let mut keys: Vec<_> = attributes.keys().filter(|k| !k.starts_with('_')).collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    keys
}

fn format_attribute(schema: Option<&ResourceSchema>, key: &str, value: &Value) -> String {
    if schema.is_some_and(|s| s.is_sensitive(key)) {
        "(sensitive)".to_string()
    } else {
        format_value(value)
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut strs: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
    }
}
