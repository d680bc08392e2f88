//! Line-oriented terminal front end.
//!
//! Reads one command per line from stdin, dispatches it to the controller
//! and prints the current notification afterwards.

use std::io::{self, Write};

use inventaire_shared::constants::{APP_NAME, APP_VERSION};
use inventaire_shared::search::{highlight, PageInfo};
use inventaire_shared::{Article, Profile};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

use crate::backend::Backend;
use crate::commands::App;
use crate::state::{LoginMode, View};

const HELP: &str = "\
Connexion
  cp <numéro>                 saisir le numéro de CP
  remember on|off             mémoriser le numéro de CP
  mode pin|password           choisir le mode de connexion
  login <mot de passe>        connexion par mot de passe
  pin <code>                  connexion rapide par code PIN
  setup-pin <pin> <confirm>   créer son code PIN
  change-pin <pin> <confirm>  modifier son code PIN
  logout                      se déconnecter
Articles
  list                        afficher la page courante
  search [terme]              rechercher (vide pour effacer)
  filter nature|location [v]  filtrer (vide pour effacer)
  next | prev | page <n>      naviguer entre les pages
  create champ=valeur ...     créer un article
  edit <id> champ=valeur ...  modifier un article
  delete <id>                 supprimer un article (confirmation y/N)
Administration
  users                       lister les utilisateurs
  role <cp> <profil>          préparer un changement de profil
  save-role <cp>              enregistrer le changement de profil
  export [dossier]            exporter au format Excel
Divers
  stats | reload | view <nom> | help | quit
Champs: symbole designation nature localisation rack niveau emplacement commentaire";

enum Flow {
    Continue,
    Quit,
}

/// Split a command line on whitespace, keeping double-quoted runs together.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}

/// Mark search matches with brackets.
fn marked(text: &str, term: &str) -> String {
    highlight(text, term)
        .into_iter()
        .map(|s| if s.matched { format!("[{}]", s.text) } else { s.text })
        .collect()
}

fn print_page(items: &[&Article], info: &PageInfo, term: &str) {
    if items.is_empty() {
        println!("Aucun article trouvé.");
        return;
    }
    for a in items {
        println!(
            "#{:<5} {:<10} {:<40} {:<5} {:<14} {}/{}/{}",
            a.id,
            marked(&a.symbol, term),
            marked(&a.designation, term),
            a.deposit_nature,
            a.location,
            a.rack,
            a.level,
            a.slot,
        );
        if !a.comment.is_empty() {
            println!("       {}", marked(&a.comment, term));
        }
    }
    println!(
        "Page {}/{} ({} articles, {}-{})",
        info.page,
        info.total_pages.max(1),
        info.total_items,
        info.start + 1,
        info.end
    );
}

fn print_prompt<B: Backend>(app: &App<B>) {
    let state = app.state();
    let who = match (&state.current_user, state.view) {
        (Some(u), View::SetupPin) => format!("{} (PIN à créer)", u.numero_cp),
        (Some(u), _) => format!("{} {}", u.numero_cp, u.profile),
        (None, _) => {
            let mode = match state.login.mode {
                LoginMode::Pin => "pin",
                LoginMode::Password => "mot de passe",
            };
            format!("connexion, {mode}")
        }
    };
    print!("[{}] {}> ", state.view.as_str(), who);
}

fn print_notification<B: Backend>(app: &App<B>, seen: &mut u64) {
    let notifier = app.notifier();
    if notifier.sequence() == *seen {
        return;
    }
    *seen = notifier.sequence();
    if let Some(n) = notifier.current() {
        if n.is_error {
            println!("!! {}", n.message);
        } else {
            println!(">> {}", n.message);
        }
    }
}

fn print_stats<B: Backend>(app: &App<B>) {
    let stats = app.statistics();
    println!("Articles: {}", stats.total_articles);
    if app.current_user().is_some_and(|u| u.is_admin()) {
        println!(
            "Utilisateurs: {} ({} actifs, {} bloqués, {} avec PIN)",
            stats.total_users, stats.active_users, stats.blocked_users, stats.users_with_pin
        );
    }
    for (title, buckets) in [
        ("Par localisation", &stats.by_location),
        ("Par nature de dépôt", &stats.by_deposit_nature),
    ] {
        println!("{title}");
        for b in buckets {
            let pct = stats.share(b);
            println!(
                "  {:<16} {:>5} {:>4}% {}",
                b.label,
                b.count,
                pct,
                inventaire_shared::stats::bar(pct)
            );
        }
    }
}

fn print_users<B: Backend>(app: &App<B>) {
    let state = app.state();
    let Some(me) = &state.current_user else {
        return;
    };
    for u in &state.users {
        let pending = app
            .pending_profile(&u.numero_cp)
            .map(|p| format!(" -> {p} (non enregistré)"))
            .unwrap_or_default();
        let lock = if me.can_edit_role(u) { "" } else { " (verrouillé)" };
        println!(
            "{:<10} {:<25} {:<15} {:<7} PIN:{}{}{}",
            u.numero_cp,
            u.name,
            u.profile,
            u.status,
            if u.has_pin { "oui" } else { "non" },
            lock,
            pending
        );
    }
}

fn apply_fields<B: Backend>(app: &mut App<B>, args: &[String]) -> bool {
    for arg in args {
        let Some((field, value)) = arg.split_once('=') else {
            println!("Argument ignoré: {arg} (attendu champ=valeur)");
            return false;
        };
        if !app.set_form_field(field, value) {
            println!("Champ inconnu: {field}");
            return false;
        }
    }
    true
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>, question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "o" | "oui" | "yes"))
}

fn user_id_for<B: Backend>(app: &App<B>, cp: &str) -> Option<Uuid> {
    app.state().user_by_cp(cp).map(|u| u.id)
}

async fn dispatch<B: Backend>(
    app: &mut App<B>,
    args: &[String],
    lines: &mut Lines<BufReader<Stdin>>,
) -> io::Result<Flow> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Flow::Continue);
    };
    let arg = |i: usize| rest.get(i).map(String::as_str).unwrap_or("");
    let joined = rest.join(" ");

    // Controller errors are already reported through the notifier.
    match command.as_str() {
        "help" | "?" => println!("{HELP}"),
        "quit" | "exit" => return Ok(Flow::Quit),

        "cp" => app.set_identifier(&joined).await,
        "remember" => app.set_remember(matches!(arg(0), "on" | "oui" | "true" | "1")),
        "mode" => {
            let wanted = if arg(0) == "pin" { LoginMode::Pin } else { LoginMode::Password };
            if app.set_login_mode(wanted) != wanted {
                println!("Aucun code PIN configuré pour ce numéro de CP.");
            }
        }
        "login" => {
            let _ = app.login_with_password(&joined).await;
        }
        "pin" => {
            let _ = app.login_with_pin(arg(0)).await;
        }
        "setup-pin" => {
            let _ = app.setup_pin(arg(0), arg(1)).await;
        }
        "change-pin" => {
            let _ = app.change_pin(arg(0), arg(1)).await;
        }
        "logout" => {
            let _ = app.logout().await;
        }
        "reload" => {
            let _ = app.reload().await;
        }

        "list" => {
            let (items, info) = app.current_page();
            print_page(&items, &info, &app.state().filters.search_term);
        }
        "search" => {
            app.set_search_term(&joined);
            let (items, info) = app.current_page();
            print_page(&items, &info, &app.state().filters.search_term);
        }
        "filter" => {
            let value = rest.get(1..).map(|v| v.join(" ")).unwrap_or_default();
            match arg(0) {
                "nature" => app.set_deposit_filter(&value),
                "location" | "localisation" => app.set_location_filter(&value),
                "clear" => app.clear_filters(),
                _ => {
                    println!("Natures: {}", app.deposit_natures().join(", "));
                    println!("Localisations: {}", app.locations().join(", "));
                }
            }
        }
        "next" | "prev" | "page" => {
            match command.as_str() {
                "next" => {
                    app.next_page();
                }
                "prev" => {
                    app.previous_page();
                }
                _ => {
                    app.go_to_page(arg(0).parse().unwrap_or(1));
                }
            }
            let (items, info) = app.current_page();
            print_page(&items, &info, &app.state().filters.search_term);
        }

        "create" => {
            if app.open_create_form().is_ok() && apply_fields(app, rest) {
                let _ = app.save_article().await;
            }
        }
        "edit" => match arg(0).parse::<i64>() {
            Ok(id) => {
                if app.open_edit_form(id).is_ok() && apply_fields(app, &rest[1..]) {
                    let _ = app.save_article().await;
                }
            }
            Err(_) => println!("Usage: edit <id> champ=valeur ..."),
        },
        "delete" => match arg(0).parse::<i64>() {
            Ok(id) => {
                if let Ok(article) = app.request_delete(id) {
                    let question = format!("Êtes-vous sûr de vouloir supprimer cet article ? ({})", article.symbol);
                    if confirm(lines, &question).await? {
                        let _ = app.confirm_delete().await;
                    } else {
                        app.cancel_delete();
                    }
                }
            }
            Err(_) => println!("Usage: delete <id>"),
        },

        "users" => {
            if app.navigate(View::Users).is_ok() {
                print_users(app);
            }
        }
        "role" => match arg(1).parse::<Profile>() {
            Ok(profile) => {
                if let Err(e) = app.stage_profile(arg(0), profile) {
                    println!("{e}");
                }
            }
            Err(e) => println!("{e}"),
        },
        "save-role" => match user_id_for(app, arg(0)) {
            Some(id) => {
                if let Err(e) = app.commit_profile(arg(0), id).await {
                    println!("{e}");
                }
            }
            None => println!("Utilisateur introuvable"),
        },
        "stats" => {
            if app.navigate(View::Stats).is_ok() {
                print_stats(app);
            }
        }
        "export" => {
            let _ = if rest.is_empty() {
                app.export()
            } else {
                app.export_to(std::path::Path::new(&joined))
            };
        }
        "view" => match View::parse(arg(0)) {
            Some(view) => {
                let _ = app.navigate(view);
            }
            None => println!("Vue inconnue: {}", arg(0)),
        },

        other => println!("Commande inconnue: {other} (tapez help)"),
    }
    Ok(Flow::Continue)
}

/// Run the command loop until `quit` or end of input.
pub async fn run<B: Backend>(app: &mut App<B>) -> io::Result<()> {
    println!("{APP_NAME} {APP_VERSION}. Tapez help pour la liste des commandes.");
    let mut seen = 0;
    print_notification(app, &mut seen);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(app);
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let args = split_args(&line);
        if let Flow::Quit = dispatch(app, &args, &mut lines).await? {
            break;
        }
        print_notification(app, &mut seen);
    }
    Ok(())
}
