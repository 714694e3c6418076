mod config;
mod dupes;
mod error;
mod id;
mod logging;
mod model;
mod notify;
mod share;
mod storage;
mod store;
mod suggest;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use config::Config;
use dupes::{Decision, Resolved};
use error::{Error, Result};
use model::{Candidate, ItemUpdate, NotificationKind, Priority, Status};

#[derive(Parser)]
#[command(name = "fc", about = "FamilyCart — shared family grocery list")]
struct Cli {
    /// Act as this user (name or id)
    #[arg(long = "as", global = true)]
    as_user: Option<String>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create .familycart/ in the current directory
    Init {
        /// Name of the first family member
        #[arg(long, default_value = "Me")]
        user: String,
    },
    /// Add items: NAME or NAME:QTY
    Add {
        #[arg(required = true)]
        specs: Vec<String>,
        /// Who is adding (defaults to the acting user)
        #[arg(long)]
        by: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Shorthand for --priority high
        #[arg(long, conflicts_with = "priority")]
        high: bool,
        #[arg(short, long)]
        category: Option<String>,
        /// Resolve duplicates right away instead of queueing them
        #[arg(long)]
        on_duplicate: Option<Decision>,
    },
    /// Show duplicates waiting for a decision
    Pending,
    /// Decide on a pending duplicate (merge, skip, add-anyway)
    Resolve {
        decision: Decision,
        #[arg(required_unless_present = "all")]
        pair: Option<u64>,
        /// Apply the decision to every pending duplicate
        #[arg(long, conflicts_with = "pair")]
        all: bool,
    },
    /// Drop every pending duplicate without deciding
    Discard,
    /// List items (default: to-buy)
    List {
        #[arg(long, conflicts_with = "all")]
        bought: bool,
        #[arg(long)]
        all: bool,
        /// Filter by name or category
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show item details
    Show { id: String },
    /// Edit an item
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        qty: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Mark an item bought
    Buy { id: String },
    /// Put a bought item back on the list
    Unbuy { id: String },
    /// Delete an item
    Delete { id: String },
    /// Delete every bought item
    ClearBought,
    /// Suggest item names containing TEXT
    Suggest { text: String },
    /// Manage family members
    User {
        #[command(subcommand)]
        action: UserCmd,
    },
    /// Manage shareable lists
    Share {
        #[command(subcommand)]
        action: ShareCmd,
    },
    /// Show the notification feed
    Notifications {
        #[command(subcommand)]
        action: Option<NotifyCmd>,
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },
    /// Print shell completions
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
enum UserCmd {
    /// Add a family member
    Add {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// List family members
    List,
}

#[derive(Subcommand)]
enum ShareCmd {
    /// Publish a new list: NAME then items as NAME or NAME:QTY
    Create {
        name: String,
        #[arg(required = true)]
        specs: Vec<String>,
        /// Mark every item high priority
        #[arg(long)]
        high: bool,
    },
    /// List shared lists
    List,
    /// Show a shared list
    Show { id: String },
    /// Check an item on a shared list on or off
    Toggle { list: String, item: String },
}

#[derive(Subcommand)]
enum NotifyCmd {
    /// Mark a notification (or all) read
    Read {
        #[arg(required_unless_present = "all")]
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
}

/// Which slice of the list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    ToBuy,
    Bought,
    All,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

struct Ctx {
    root: PathBuf,
    config: Config,
    as_user: Option<String>,
}

impl Ctx {
    fn user_key(&self) -> Option<&str> {
        self.as_user
            .as_deref()
            .or(self.config.current_user.as_deref())
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = storage::root()?;
    let command = match cli.command {
        Cmd::Init { user } => {
            let mut s = model::Store::default();
            store::add_user(&mut s, &user, None)?;
            let dir = storage::init(&root, &s)?;
            println!("initialized {} (user {user})", dir.display());
            return Ok(());
        }
        Cmd::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "fc", &mut std::io::stdout());
            return Ok(());
        }
        other => other,
    };
    let config = config::load(&storage::data_dir(&root))?;
    let ctx = Ctx {
        root,
        config,
        as_user: cli.as_user,
    };

    match command {
        Cmd::Add {
            specs,
            by,
            priority,
            high,
            category,
            on_duplicate,
        } => {
            let mut s = storage::load(&ctx.root)?;
            let user = store::acting_user(&s, by.as_deref().or(ctx.user_key()))?;
            let priority = if high {
                Priority::High
            } else {
                priority.unwrap_or_default()
            };
            let category = category.unwrap_or_else(|| ctx.config.default_category.clone());
            let candidates: Vec<Candidate> = specs
                .iter()
                .filter_map(|spec| store::parse_spec(spec))
                .map(|(name, qty)| Candidate {
                    name,
                    category: category.clone(),
                    quantity: qty.unwrap_or_else(|| ctx.config.default_quantity.clone()),
                    priority: priority.clone(),
                    status: Status::ToBuy,
                    added_by: user.clone(),
                })
                .collect();
            if candidates.is_empty() {
                return Err(Error::Invalid("nothing to add".to_string()));
            }

            let detection = dupes::detect(candidates, &store::items_newest_first(&s));
            let ids = store::create_items(&mut s, detection.unique)?;
            for id in &ids {
                if let Some(item) = s.items.get(id) {
                    println!("created {id} {}", item.name);
                }
            }
            note_added(&mut s, &ctx.config, &user, ids.len());

            let queued = s.pending.extend(detection.duplicates);
            let mut failures = 0;
            if let Some(decision) = on_duplicate {
                let resolved: Vec<Resolved> = queued
                    .iter()
                    .filter_map(|pid| s.pending.resolve(*pid, decision))
                    .collect();
                failures = apply_resolved(&mut s, &ctx.config, &user, resolved);
            } else if !queued.is_empty() {
                for pid in &queued {
                    if let Some(q) = s.pending.get(*pid) {
                        println!(
                            "duplicate #{pid}: '{}' is already on the list as {} (qty {})",
                            q.pair.candidate.name, q.pair.existing.id, q.pair.existing.quantity
                        );
                    }
                }
                println!("decide with `fc resolve <merge|skip|add-anyway> <pair>`");
            }
            storage::save(&ctx.root, &s)?;
            check_failures(failures)
        }
        Cmd::Pending => {
            let mut s = storage::load(&ctx.root)?;
            let items = store::items_newest_first(&s);
            let released = s.pending.refresh(&items);
            for r in &released {
                println!(
                    "#{} {}: no longer on the list, will be added on the next resolve",
                    r.pair_id, r.name
                );
            }
            if s.pending.is_empty() {
                if released.is_empty() {
                    println!("no pending duplicates");
                }
                return Ok(());
            }
            println!(
                "{:<6} {:<20} {:<10} {:<12} {:<12} {}",
                "PAIR", "NAME", "EXISTING", "HAVE", "ADDING", "MERGED"
            );
            println!("{}", "-".repeat(76));
            for q in s.pending.iter() {
                let p = &q.pair;
                println!(
                    "#{:<5} {:<20} {:<10} {:<12} {:<12} {}",
                    q.id,
                    p.candidate.name,
                    p.existing.id,
                    p.existing.quantity,
                    p.candidate.quantity,
                    dupes::merge_quantity(&p.existing.quantity, &p.candidate.quantity)
                );
            }
            Ok(())
        }
        Cmd::Resolve {
            decision,
            pair,
            all,
        } => {
            let mut s = storage::load(&ctx.root)?;
            let user = store::acting_user(&s, ctx.user_key())?;
            // Items may have been edited, bought or deleted since `fc add`
            let items = store::items_newest_first(&s);
            let mut resolved = s.pending.refresh(&items);
            for r in &resolved {
                println!("#{} {}: no longer on the list", r.pair_id, r.name);
            }
            let released = resolved.len();
            match (all, pair) {
                (true, _) => resolved.extend(s.pending.resolve_all(decision)),
                (false, Some(pid)) => resolved.extend(s.pending.resolve(pid, decision)),
                (false, None) => {}
            }
            if resolved.len() == released {
                let handled = pair.is_some_and(|pid| resolved.iter().any(|r| r.pair_id == pid));
                match pair {
                    Some(pid) if !all && !handled => println!("pair #{pid} is not pending"),
                    _ if released == 0 => println!("no pending duplicates"),
                    _ => {}
                }
                if released == 0 {
                    return Ok(());
                }
            }
            let failures = apply_resolved(&mut s, &ctx.config, &user, resolved);
            storage::save(&ctx.root, &s)?;
            check_failures(failures)
        }
        Cmd::Discard => {
            let mut s = storage::load(&ctx.root)?;
            let n = s.pending.discard();
            storage::save(&ctx.root, &s)?;
            println!("discarded {n} pending duplicate(s)");
            Ok(())
        }
        Cmd::List {
            bought,
            all,
            search,
        } => {
            let s = storage::load(&ctx.root)?;
            let view = match (bought, all) {
                (_, true) => View::All,
                (true, false) => View::Bought,
                (false, false) => View::ToBuy,
            };
            let shown: Vec<&model::Item> = s
                .items
                .values()
                .filter(|i| should_show(i, view))
                .collect();
            let shown = store::search(shown, search.as_deref().unwrap_or(""));
            let shown = store::sorted_for_display(shown);
            if shown.is_empty() {
                println!("no items");
            } else {
                print_list_header();
                for item in shown {
                    print_list_row(&s, item);
                }
            }
            let stats = store::stats(&s);
            println!(
                "\nto buy: {}  bought: {}  total: {}",
                stats.to_buy, stats.bought, stats.total
            );
            if !s.pending.is_empty() {
                println!("{} duplicate(s) pending, see `fc pending`", s.pending.len());
            }
            Ok(())
        }
        Cmd::Show { id } => {
            let s = storage::load(&ctx.root)?;
            let id = store::resolve_id(&s, &id)?;
            let item = s
                .items
                .get(&id)
                .ok_or_else(|| Error::not_found("item", id.as_str()))?;
            println!("  ID: {}", item.id);
            println!("  Name: {}", item.name);
            println!("  Quantity: {}", item.quantity);
            println!("  Priority: {}", item.priority);
            println!("  Status: {}", item.status);
            println!("  Category: {}", item.category);
            println!("  Added by: {}", store::user_name(&s, &item.added_by));
            println!("  Created: {}", item.created_at.format("%Y-%m-%d %H:%M"));
            if let Some(ref by) = item.bought_by {
                println!("  Bought by: {}", store::user_name(&s, by));
            }
            if let Some(at) = item.bought_at {
                println!("  Bought: {}", at.format("%Y-%m-%d %H:%M"));
            }
            Ok(())
        }
        Cmd::Edit {
            id,
            name,
            qty,
            priority,
            category,
        } => {
            let mut s = storage::load(&ctx.root)?;
            let id = store::resolve_id(&s, &id)?;
            let update = ItemUpdate {
                name,
                quantity: qty,
                priority,
                category,
                ..Default::default()
            };
            if update.is_empty() {
                return Err(Error::Invalid("nothing to update".to_string()));
            }
            store::update_item(&mut s, &id, update)?;
            storage::save(&ctx.root, &s)?;
            println!("updated {id}");
            Ok(())
        }
        Cmd::Buy { id } => {
            let mut s = storage::load(&ctx.root)?;
            let user = store::acting_user(&s, ctx.user_key())?;
            let id = store::set_bought(&mut s, &id, &user)?;
            let name = s.items.get(&id).map(|i| i.name.clone()).unwrap_or_default();
            let message = format!("{} bought {name}", store::user_name(&s, &user));
            notify::push(
                &mut s,
                NotificationKind::ItemBought,
                message,
                &user,
                ctx.config.notification_limit,
            );
            storage::save(&ctx.root, &s)?;
            println!("bought {id} {name}");
            Ok(())
        }
        Cmd::Unbuy { id } => {
            let mut s = storage::load(&ctx.root)?;
            let id = store::set_to_buy(&mut s, &id)?;
            storage::save(&ctx.root, &s)?;
            println!("back on the list {id}");
            Ok(())
        }
        Cmd::Delete { id } => {
            let mut s = storage::load(&ctx.root)?;
            let id = store::delete_item(&mut s, &id)?;
            storage::save(&ctx.root, &s)?;
            println!("deleted {id}");
            Ok(())
        }
        Cmd::ClearBought => {
            let mut s = storage::load(&ctx.root)?;
            let n = store::clear_bought(&mut s);
            storage::save(&ctx.root, &s)?;
            println!("cleared {n} bought item(s)");
            Ok(())
        }
        Cmd::Suggest { text } => {
            let s = storage::load(&ctx.root)?;
            for name in suggest::suggestions(&s, &text) {
                println!("{name}");
            }
            Ok(())
        }
        Cmd::User { action } => match action {
            UserCmd::Add { name, color } => {
                let mut s = storage::load(&ctx.root)?;
                let id = store::add_user(&mut s, &name, color)?;
                storage::save(&ctx.root, &s)?;
                println!("added user {id} {}", name.trim());
                Ok(())
            }
            UserCmd::List => {
                let s = storage::load(&ctx.root)?;
                let acting = store::acting_user(&s, ctx.user_key()).ok();
                for u in store::users_by_age(&s) {
                    let mark = if acting.as_deref() == Some(u.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{mark} {:<8} {:<8} {}", u.id, u.color, u.name);
                }
                Ok(())
            }
        },
        Cmd::Share { action } => match action {
            ShareCmd::Create { name, specs, high } => {
                let mut s = storage::load(&ctx.root)?;
                let user = store::acting_user(&s, ctx.user_key())?;
                let priority = if high { Priority::High } else { Priority::Low };
                let items = specs
                    .iter()
                    .filter_map(|spec| store::parse_spec(spec))
                    .map(|(name, qty)| share::NewSharedItem {
                        name,
                        quantity: qty.unwrap_or_else(|| ctx.config.default_quantity.clone()),
                        priority: priority.clone(),
                    })
                    .collect();
                let id = share::create_shared_list(&mut s, &name, items, &ctx.config.share_base_url)?;
                let (list_name, url) = match s.shared_lists.get(&id) {
                    Some(l) => (l.name.clone(), l.share_url.clone()),
                    None => return Err(Error::not_found("shared list", id)),
                };
                let message = format!("{} shared list '{list_name}'", store::user_name(&s, &user));
                notify::push(
                    &mut s,
                    NotificationKind::ListShared,
                    message,
                    &user,
                    ctx.config.notification_limit,
                );
                storage::save(&ctx.root, &s)?;
                println!("created shared list {id}");
                println!("{url}");
                Ok(())
            }
            ShareCmd::List => {
                let s = storage::load(&ctx.root)?;
                if s.shared_lists.is_empty() {
                    println!("no shared lists");
                }
                for list in s.shared_lists.values() {
                    let stats = share::list_stats(list);
                    println!(
                        "{:<10} {:<20} {} to buy, {} bought  {}",
                        list.id, list.name, stats.to_buy, stats.bought, list.share_url
                    );
                }
                Ok(())
            }
            ShareCmd::Show { id } => {
                let s = storage::load(&ctx.root)?;
                let id = share::resolve_list(&s, &id)?;
                let list = s
                    .shared_lists
                    .get(&id)
                    .ok_or_else(|| Error::not_found("shared list", id.as_str()))?;
                println!("{} ({})", list.name, list.share_url);
                let stats = share::list_stats(list);
                println!("to buy: {}  bought: {}", stats.to_buy, stats.bought);
                for item in &list.items {
                    let mark = if item.status == Status::Bought { "x" } else { " " };
                    println!(
                        "[{mark}] {:<12} {:<20} {:<8} {}",
                        item.id, item.name, item.quantity, item.priority
                    );
                }
                Ok(())
            }
            ShareCmd::Toggle { list, item } => {
                let mut s = storage::load(&ctx.root)?;
                let status = share::toggle_shared_item(&mut s, &list, &item)?;
                storage::save(&ctx.root, &s)?;
                println!("{item} is now {status}");
                Ok(())
            }
        },
        Cmd::Notifications { action, unread } => match action {
            Some(NotifyCmd::Read { id, all }) => {
                let mut s = storage::load(&ctx.root)?;
                match (all, id) {
                    (true, _) | (false, None) => {
                        let n = notify::mark_all_read(&mut s);
                        println!("marked {n} notification(s) read");
                    }
                    (false, Some(id)) => {
                        notify::mark_read(&mut s, &id)?;
                        println!("marked {id} read");
                    }
                }
                storage::save(&ctx.root, &s)?;
                Ok(())
            }
            None => {
                let s = storage::load(&ctx.root)?;
                for n in s.notifications.iter().filter(|n| !unread || !n.is_read) {
                    let mark = if n.is_read { " " } else { "*" };
                    println!(
                        "{mark} {:<8} {} {:<12} {}",
                        n.id,
                        n.timestamp.format("%Y-%m-%d %H:%M"),
                        n.kind,
                        n.message
                    );
                }
                println!("{} unread", notify::unread_count(&s));
                Ok(())
            }
        },
        Cmd::Init { .. } | Cmd::Completions { .. } => Ok(()),
    }
}

/// Hand each resolution to storage, reporting per pair. A failed hand-off
/// is counted but the pair stays resolved.
fn apply_resolved(
    s: &mut model::Store,
    config: &Config,
    user: &str,
    resolved: Vec<Resolved>,
) -> usize {
    let mut created = 0;
    let mut failures = 0;
    for r in resolved {
        match store::apply_resolution(s, &r.action) {
            Ok(Some(id)) => {
                created += 1;
                println!("#{} {}: {} as {id}", r.pair_id, r.name, r.outcome);
            }
            Ok(None) => println!("#{} {}: {}", r.pair_id, r.name, r.outcome),
            Err(e) => {
                warn!(pair = r.pair_id, error = %e, "resolution not applied");
                eprintln!("#{} {}: could not apply {}: {e}", r.pair_id, r.name, r.outcome);
                failures += 1;
            }
        }
    }
    note_added(s, config, user, created);
    failures
}

fn check_failures(failures: usize) -> Result<()> {
    if failures > 0 {
        return Err(Error::Invalid(format!(
            "{failures} duplicate resolution(s) could not be applied"
        )));
    }
    Ok(())
}

fn note_added(s: &mut model::Store, config: &Config, user: &str, count: usize) {
    if count == 0 {
        return;
    }
    let message = format!(
        "{} added {count} item(s) to the grocery list",
        store::user_name(s, user)
    );
    notify::push(
        s,
        NotificationKind::ItemAdded,
        message,
        user,
        config.notification_limit,
    );
}

fn should_show(item: &model::Item, view: View) -> bool {
    match view {
        View::All => true,
        View::ToBuy => item.status == Status::ToBuy,
        View::Bought => item.status == Status::Bought,
    }
}

fn print_list_header() {
    println!(
        "{:<8} {:<5} {:<12} {:<10} {}",
        "ID", "PRI", "QTY", "ADDED BY", "NAME"
    );
    println!("{}", "-".repeat(60));
}

fn print_list_row(s: &model::Store, item: &model::Item) {
    let name = if item.status == Status::Bought {
        match item.bought_by {
            Some(ref by) => format!("{} (bought by {})", item.name, store::user_name(s, by)),
            None => format!("{} (bought)", item.name),
        }
    } else {
        item.name.clone()
    };
    println!(
        "{:<8} {:<5} {:<12} {:<10} {}",
        item.id,
        item.priority,
        item.quantity,
        store::user_name(s, &item.added_by),
        name
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_item(status: Status) -> model::Item {
        model::Item {
            id: "it-test".to_string(),
            name: "test".to_string(),
            category: "Groceries".to_string(),
            quantity: "1".to_string(),
            priority: Priority::Low,
            status,
            created_at: Utc::now(),
            added_by: "us-test".to_string(),
            bought_by: None,
            bought_at: None,
        }
    }

    #[test]
    fn hides_bought_by_default() {
        assert!(!should_show(&make_item(Status::Bought), View::ToBuy));
        assert!(should_show(&make_item(Status::ToBuy), View::ToBuy));
    }

    #[test]
    fn bought_view_shows_only_bought() {
        assert!(should_show(&make_item(Status::Bought), View::Bought));
        assert!(!should_show(&make_item(Status::ToBuy), View::Bought));
    }

    #[test]
    fn all_view_shows_everything() {
        assert!(should_show(&make_item(Status::Bought), View::All));
        assert!(should_show(&make_item(Status::ToBuy), View::All));
    }

    #[test]
    fn cli_parses_resolve_forms() {
        let cli = Cli::try_parse_from(["fc", "resolve", "merge", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Cmd::Resolve {
                decision: Decision::Merge,
                pair: Some(3),
                all: false
            }
        ));
        let cli = Cli::try_parse_from(["fc", "resolve", "skip", "--all"]).unwrap();
        assert!(matches!(cli.command, Cmd::Resolve { all: true, .. }));
        assert!(Cli::try_parse_from(["fc", "resolve", "replace", "1"]).is_err());
        assert!(Cli::try_parse_from(["fc", "resolve", "merge"]).is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
