//! Line-oriented shell driving the core update loop.
//!
//! Each command maps to a [`Msg`]; engine completions are pumped back in
//! between prompts and the view re-renders when the state marks itself dirty.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use agro_core::{
    update, AppState, CacheKey, CacheValue, Crop, CropForm, FormStage, Interest, InterestSort,
    InterestStatus, Msg, Severity,
};
use client_logging::client_info;

use crate::effects::EffectRunner;

/// How long to keep draining engine completions after each command.
const PUMP_WINDOW: Duration = Duration::from_millis(800);

pub fn run() -> anyhow::Result<()> {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(msg_tx)?;
    let mut state = AppState::new();
    let mut last_listing: Option<CacheKey> = None;

    // Let the initial session report land before the first prompt.
    pump(&mut state, &runner, &msg_rx, Duration::from_millis(300));
    state.consume_dirty();

    println!("AgroBridge shell. Type `help` for commands.");
    let stdin = io::stdin();
    loop {
        print!("agrobridge> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            _ => {}
        }

        let Some(msg) = parse_command(line) else {
            println!("Unrecognized command; try `help`.");
            continue;
        };
        client_info!("command: {}", line);
        if let Some(key) = listing_key(&msg, &state) {
            last_listing = Some(key);
        }

        let (next, effects) = update(std::mem::take(&mut state), msg);
        state = next;
        runner.enqueue(effects);

        pump(&mut state, &runner, &msg_rx, PUMP_WINDOW);
        render(&mut state, last_listing.as_ref());
    }
    Ok(())
}

/// Drain engine completions for up to `window`, feeding each through the
/// update loop and dispatching any effects it produces.
fn pump(
    state: &mut AppState,
    runner: &EffectRunner,
    msg_rx: &mpsc::Receiver<Msg>,
    window: Duration,
) {
    let deadline = Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match msg_rx.recv_timeout(remaining) {
            Ok(msg) => {
                let (next, effects) = update(std::mem::take(state), msg);
                *state = next;
                runner.enqueue(effects);
            }
            Err(_) => break,
        }
    }
}

fn parse_command(line: &str) -> Option<Msg> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "login" => {
            let mut parts = rest.split_whitespace();
            Some(Msg::SignInSubmitted {
                email: parts.next()?.to_string(),
                password: parts.next()?.to_string(),
            })
        }
        "register" => {
            let mut parts = rest.split_whitespace();
            Some(Msg::RegisterSubmitted {
                name: parts.next()?.to_string(),
                email: parts.next()?.to_string(),
                password: parts.next()?.to_string(),
                photo: parts.next().unwrap_or("").to_string(),
            })
        }
        "google" => Some(Msg::FederatedSignInClicked),
        "logout" => Some(Msg::SignOutClicked),
        "latest" => Some(Msg::LatestOpened),
        "list" => Some(Msg::BrowseOpened {
            search: if rest.is_empty() {
                None
            } else {
                Some(rest.to_string())
            },
        }),
        "mine" => Some(Msg::MyPostsOpened),
        "interests" => Some(Msg::MyInterestsOpened {
            sort: if rest.is_empty() {
                InterestSort::NewestFirst
            } else {
                InterestSort::parse(rest)?
            },
        }),
        "profile" => Some(Msg::ProfileOpened),
        "save-profile" => {
            let mut parts = rest.split_whitespace();
            Some(Msg::ProfileSaveSubmitted {
                name: parts.next()?.to_string(),
                photo: parts.next().unwrap_or("").to_string(),
            })
        }
        "open" => (!rest.is_empty()).then(|| Msg::CropOpened {
            crop_id: rest.to_string(),
        }),
        "close" => Some(Msg::CropClosed),
        "qty" => Some(Msg::QuantityChanged {
            value: rest.parse().ok()?,
        }),
        "msg" => Some(Msg::MessageChanged {
            value: rest.to_string(),
        }),
        "interest" => Some(Msg::InterestSubmitted),
        "confirm" => Some(Msg::InterestConfirmed),
        "back" => Some(Msg::ConfirmDismissed),
        "accept" => (!rest.is_empty()).then(|| Msg::StatusActionClicked {
            interest_id: rest.to_string(),
            status: InterestStatus::Accepted,
        }),
        "reject" => (!rest.is_empty()).then(|| Msg::StatusActionClicked {
            interest_id: rest.to_string(),
            status: InterestStatus::Rejected,
        }),
        "add-crop" => Some(Msg::CropFormSubmitted {
            form: parse_crop_form(rest),
        }),
        "edit-crop" => {
            let (crop_id, fields) = rest.split_once(char::is_whitespace)?;
            Some(Msg::CropEditSubmitted {
                crop_id: crop_id.to_string(),
                patch: parse_crop_patch(fields.trim()),
            })
        }
        "delete-crop" => (!rest.is_empty()).then(|| Msg::CropDeleteRequested {
            crop_id: rest.to_string(),
        }),
        _ => None,
    }
}

/// Parse `key=value;key=value` pairs into the listing form.
fn parse_crop_form(input: &str) -> CropForm {
    let mut form = CropForm::default();
    for pair in input.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "name" => form.name = value.to_string(),
            "type" => form.kind = value.to_string(),
            "price" => form.price_per_unit = value.parse().ok(),
            "unit" => form.unit = value.to_string(),
            "qty" => form.quantity = value.parse().ok(),
            "desc" => form.description = value.to_string(),
            "location" => form.location = value.to_string(),
            "image" => form.image = value.to_string(),
            _ => {}
        }
    }
    form
}

fn parse_crop_patch(input: &str) -> agro_core::CropPatch {
    let mut patch = agro_core::CropPatch::default();
    for pair in input.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "name" => patch.name = Some(value.to_string()),
            "type" => patch.kind = Some(value.to_string()),
            "price" => patch.price_per_unit = value.parse().ok(),
            "unit" => patch.unit = Some(value.to_string()),
            "qty" => patch.quantity = value.parse().ok(),
            "desc" => patch.description = Some(value.to_string()),
            "location" => patch.location = Some(value.to_string()),
            "image" => patch.image = Some(value.to_string()),
            _ => {}
        }
    }
    patch
}

/// The cache key a navigation command will render from, so the shell knows
/// which listing to print once the fetch lands.
fn listing_key(msg: &Msg, state: &AppState) -> Option<CacheKey> {
    let email = state.session().user().map(|user| user.email.clone());
    match msg {
        Msg::LatestOpened => Some(CacheKey::Latest),
        Msg::BrowseOpened { search } => Some(CacheKey::CropList {
            search: search
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }),
        Msg::MyPostsOpened => Some(CacheKey::MyPosts {
            owner_email: email?,
        }),
        Msg::MyInterestsOpened { sort } => Some(CacheKey::MyInterests {
            email: email?,
            sort: *sort,
        }),
        Msg::ProfileOpened => Some(CacheKey::Profile(email?)),
        _ => None,
    }
}

fn render(state: &mut AppState, last_listing: Option<&CacheKey>) {
    for notice in state.take_notices() {
        let tag = match notice.severity {
            Severity::Success => "ok",
            Severity::Error => "error",
            Severity::Warning => "warn",
        };
        println!("[{}] {}", tag, notice.message);
    }
    if !state.consume_dirty() {
        return;
    }

    let view = state.view();
    match (&view.session.email, view.session.resolved) {
        (Some(email), _) => println!(
            "signed in as {} <{}>",
            view.session.display_name.as_deref().unwrap_or(""),
            email
        ),
        (None, true) => println!("signed out"),
        (None, false) => println!("session pending..."),
    }

    if let Some(detail) = &view.detail {
        match &detail.crop {
            Some(crop) => print_detail(crop, detail),
            None => println!("crop {} loading...", detail.crop_id),
        }
        return;
    }

    if let Some(key) = last_listing {
        match state.cache().get(key) {
            Some(CacheValue::Crops(crops)) => print_crops(crops),
            Some(CacheValue::Interests(interests)) => print_interests(interests),
            Some(CacheValue::Profile(profile)) => {
                println!("profile: {} <{}>", profile.name, profile.email);
            }
            Some(CacheValue::Crop(_)) | None => {}
        }
    }
}

fn print_crops(crops: &[Crop]) {
    if crops.is_empty() {
        println!("(no crops)");
        return;
    }
    for crop in crops {
        println!(
            "{}  {}  {:.2}/{}  {} {} left  {}",
            crop.id, crop.name, crop.price_per_unit, crop.unit, crop.quantity, crop.unit,
            crop.location
        );
    }
}

fn print_interests(interests: &[Interest]) {
    if interests.is_empty() {
        println!("(no interests)");
        return;
    }
    for interest in interests {
        println!(
            "{}  crop={}  qty={}  total={:.2}  {}",
            interest.id, interest.crop_id, interest.quantity, interest.total_price,
            interest.status
        );
    }
}

fn print_detail(crop: &Crop, detail: &agro_core::CropDetailView) {
    println!(
        "{} ({}) {:.2}/{} at {}",
        crop.name, crop.kind, crop.price_per_unit, crop.unit, crop.location
    );
    println!(
        "{} of {} {} remaining. {}",
        crop.quantity, crop.total_quantity, crop.unit, crop.description
    );
    println!("owner: {} <{}>", crop.owner.owner_name, crop.owner.owner_email);

    if detail.is_owner {
        if crop.interests.is_empty() {
            println!("no interests received yet");
        }
        for interest in &crop.interests {
            println!(
                "  {}  {} <{}>  qty={}  total={:.2}  {}",
                interest.id,
                interest.user_name,
                interest.user_email,
                interest.quantity,
                interest.total_price,
                interest.status
            );
        }
        if detail.status_updating {
            println!("(status update in flight)");
        }
        return;
    }

    if let Some(status) = detail.existing_status {
        println!("your interest: {}", status);
        return;
    }

    match detail.stage {
        FormStage::Editing => {
            println!(
                "form: qty={} total={:.2} message={:?}{}",
                detail.quantity,
                detail.total_price,
                detail.message,
                if detail.can_submit { "" } else { " (cannot submit)" }
            );
        }
        FormStage::Confirming { total_price } => {
            println!(
                "confirm purchase of {} {} for {:.2}? (`confirm` or `back`)",
                detail.quantity, crop.unit, total_price
            );
        }
        FormStage::Submitting => println!("sending interest..."),
    }
}

fn print_help() {
    println!("session:   login <email> <password> | register <name> <email> <password> [photo]");
    println!("           google | logout | profile | save-profile <name> [photo]");
    println!("browse:    latest | list [search] | mine | interests [quantity-desc|quantity-asc|status]");
    println!("detail:    open <cropId> | close | qty <n> | msg <text> | interest | confirm | back");
    println!("owner:     accept <interestId> | reject <interestId>");
    println!("crops:     add-crop name=..;type=..;price=..;unit=..;qty=..;location=..;image=..;desc=..");
    println!("           edit-crop <cropId> <field=value;..> | delete-crop <cropId>");
    println!("           help | quit");
}
