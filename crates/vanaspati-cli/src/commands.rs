//! Command handlers and text rendering.

use anyhow::{bail, Result};
use serde_json::json;
use tracing::info;

use vanaspati_client::{SessionState, VanaspatiClient};
use vanaspati_core::logging::component;
use vanaspati_core::{
    filter_by_status, format_class_name, is_healthy, ConfidenceLevel, DiagnosisRecord,
    GardenPlant, GardenStats, NewDiagnosis, NewGardenPlant, PlantUpdate, RecordId,
};

use crate::{GardenCommand, HistoryCommand, SaveDiagnosisArgs};

/// Text or JSON output on stdout.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit(&self, value: serde_json::Value, text: impl FnOnce() -> String) {
        if self.json {
            println!("{}", value);
        } else {
            println!("{}", text());
        }
    }
}

pub async fn login(
    client: &VanaspatiClient,
    out: &Output,
    username: &str,
    password: &str,
) -> Result<()> {
    let response = client.session.login(username, password).await?;
    out.emit(
        json!({
            "username": response.username,
            "email": response.email,
            "is_admin": response.is_admin,
        }),
        || format!("Logged in as {} <{}>", response.username, response.email),
    );
    Ok(())
}

pub async fn signup(
    client: &VanaspatiClient,
    out: &Output,
    username: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<()> {
    let response = client
        .session
        .signup(username, email, password, confirmation)
        .await?;
    let message = response
        .message
        .clone()
        .unwrap_or_else(|| "Account created".to_string());
    out.emit(json!({ "message": message }), || {
        format!("{}. Log in with `vanaspati login -u {}`.", message, username)
    });
    Ok(())
}

pub fn logout(client: &VanaspatiClient, out: &Output) -> Result<()> {
    client.logout()?;
    out.emit(json!({ "logged_out": true }), || "Logged out".to_string());
    Ok(())
}

pub async fn whoami(client: &VanaspatiClient, out: &Output) -> Result<()> {
    match client.session.initialize().await {
        SessionState::Authenticated(session) => {
            out.emit(json!(session), || {
                let role = if session.is_admin { " (admin)" } else { "" };
                format!("{} <{}>{}", session.username, session.email, role)
            });
            Ok(())
        }
        _ => bail!("not logged in"),
    }
}

pub async fn history(client: &VanaspatiClient, out: &Output, cmd: HistoryCommand) -> Result<()> {
    require_token(client)?;

    match cmd {
        HistoryCommand::List { limit, offset } => {
            client.history.load_page(limit, offset).await?;
            let records = client.history.records();
            let server_total = client.history.server_total();
            out.emit(
                json!({ "history": records, "total": server_total }),
                || render_history(&records, server_total),
            );
        }
        HistoryCommand::Save(args) => {
            let id = client.history.add(new_diagnosis(args)).await?;
            out.emit(json!({ "diagnosis_id": id }), || {
                format!("Saved diagnosis {}", id)
            });
        }
        HistoryCommand::Delete { id } => {
            client.history.delete(&RecordId::from(id.clone())).await?;
            out.emit(json!({ "deleted": id }), || format!("Deleted diagnosis {}", id));
        }
        HistoryCommand::Clear => {
            client.history.clear_all().await?;
            out.emit(json!({ "cleared": true }), || "History cleared".to_string());
        }
    }
    Ok(())
}

pub async fn garden(client: &VanaspatiClient, out: &Output, cmd: GardenCommand) -> Result<()> {
    require_token(client)?;

    match cmd {
        GardenCommand::List { status } => {
            let plants = client.garden.list().await?;
            let stats = GardenStats::from_plants(&plants);
            let shown = filter_by_status(&plants, status);
            out.emit(json!({ "plants": shown, "stats": stats }), || {
                render_garden(&shown, &stats)
            });
        }
        GardenCommand::Save {
            plant,
            disease,
            confidence,
            notes,
            status,
        } => {
            let mut new_plant = NewGardenPlant::new(plant, disease, confidence).with_status(status);
            if let Some(notes) = notes {
                new_plant = new_plant.with_notes(notes);
            }
            let created = client.garden.save(&new_plant).await?;
            out.emit(created, || format!("Saved {} to your garden", new_plant.plant_name));
        }
        GardenCommand::Promote { diagnosis_id } => {
            let id = RecordId::from(diagnosis_id);
            let record = find_diagnosis(client, &id).await?;
            let new_plant = NewGardenPlant::from_diagnosis(&record);
            let created = client.garden.save(&new_plant).await?;
            info!(
                component = component::CLI,
                diagnosis_id = %id,
                plant_name = %new_plant.plant_name,
                "Promoted diagnosis to garden"
            );
            out.emit(created, || {
                format!(
                    "Tracking {} ({})",
                    new_plant.plant_name,
                    format_class_name(&new_plant.disease_name)
                )
            });
        }
        GardenCommand::Update { id, notes, status } => {
            let update = PlantUpdate { notes, status };
            let updated = client
                .garden
                .update(&RecordId::from(id.clone()), &update)
                .await?;
            out.emit(updated, || format!("Updated plant {}", id));
        }
        GardenCommand::Delete { id } => {
            client.garden.delete(&RecordId::from(id.clone())).await?;
            out.emit(json!({ "deleted": id }), || format!("Removed plant {}", id));
        }
    }
    Ok(())
}

fn require_token(client: &VanaspatiClient) -> Result<()> {
    if !client.api.has_token() {
        bail!("not logged in; run `vanaspati login` first");
    }
    Ok(())
}

/// Look a diagnosis up in the cached history, loading pages until found.
async fn find_diagnosis(client: &VanaspatiClient, id: &RecordId) -> Result<DiagnosisRecord> {
    let limit = vanaspati_core::defaults::HISTORY_PAGE_LIMIT;
    let mut offset = 0;
    loop {
        client.history.load_page(limit, offset).await?;
        if let Some(record) = client.history.get(id) {
            return Ok(record);
        }
        offset += limit;
        if u64::from(offset) >= client.history.server_total() {
            break;
        }
    }
    bail!("diagnosis {} not found in history", id)
}

fn new_diagnosis(args: SaveDiagnosisArgs) -> NewDiagnosis {
    let entry = if args.batch {
        NewDiagnosis::batch(args.image, args.class_name, args.confidence)
    } else {
        NewDiagnosis::single(args.image, args.class_name, args.confidence)
    };
    match args.notes {
        Some(notes) => entry.with_notes(notes),
        None => entry,
    }
}

fn render_history(records: &[DiagnosisRecord], server_total: u64) -> String {
    if records.is_empty() {
        return "No diagnoses saved yet".to_string();
    }
    let mut lines = vec![format!(
        "{} of {} diagnoses, newest first",
        records.len(),
        server_total
    )];
    for record in records {
        let mut line = format!(
            "  [{}] {}  {}  {:.1}% ({})  {}",
            record.id,
            record.diagnosed_at.format("%Y-%m-%d %H:%M"),
            format_class_name(&record.disease_name),
            record.confidence * 100.0,
            ConfidenceLevel::from_confidence(record.confidence),
            record.image_name,
        );
        push_healthy_marker(&mut line, &record.disease_name);
        lines.push(line);
    }
    lines.join("\n")
}

fn push_healthy_marker(line: &mut String, class_name: &str) {
    if is_healthy(class_name) {
        line.push_str("  [healthy]");
    }
}

fn render_garden(plants: &[&GardenPlant], stats: &GardenStats) -> String {
    let mut lines = vec![format!(
        "{} plants: {} monitoring, {} treating, {} recovered",
        stats.total, stats.monitoring, stats.treating, stats.recovered
    )];
    for plant in plants {
        let mut line = format!(
            "  [{}] {}  {}  {}",
            plant.id,
            plant.plant_name,
            format_class_name(&plant.disease_name),
            plant.status
        );
        push_healthy_marker(&mut line, &plant.disease_name);
        if let Some(notes) = plant.notes.as_deref().filter(|n| !n.is_empty()) {
            line.push_str(&format!("  \"{}\"", notes));
        }
        lines.push(line);
    }
    lines.join("\n")
}
