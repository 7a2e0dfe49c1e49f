#[macro_use] extern crate rocket;

use dotenv::dotenv;
use log::{error, info, warn};

use rocket::fairing::{self, AdHoc, Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Build, Request, Response, Rocket, State};

mod auth;
mod config;
mod notes;
mod structs;

use auth::Admin;
use config::AppConfig;
use notes::Notes;
use structs::{Note, NoteBody, NoteId, NoteInput, NotePatch, NoteVector};

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[launch]
fn rocket() -> _ {
    dotenv().ok();

    app().attach(AdHoc::try_on_ignite("Admin directory", load_admin_directory))
}

/// Everything except the admin directory, which the caller manages.
fn app() -> Rocket<Build> {
    rocket::build()
        .attach(CORS)
        .manage(Notes::new())
        .mount("/notes", routes![
            create_note, list_notes, get_note, replace_note, patch_note, delete_note, preflight,
        ])
        .register("/", catchers![unauthorized, forbidden, internal_error])
}

async fn load_admin_directory(rocket: Rocket<Build>) -> fairing::Result {
    let config = match rocket.figment().extract::<AppConfig>() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid admin configuration: {}", e);
            return Err(rocket);
        }
    };

    if !config.has_admins() {
        warn!("No admins configured, every note request will be refused");
    }

    Ok(rocket.manage(config.admin_directory()))
}

// Routes //////////////////////////////////////////////////////////////////////////////////////////

#[post("/", data = "<note>")]
fn create_note(_admin: Admin, notes: &State<Notes>, note: NoteBody<NoteInput>) -> status::NoContent {
    let NoteInput { title, content, user } = note.into_inner();
    let id = notes.add(title, content, user);
    info!("Created note {}", id);

    status::NoContent
}

// The caller's token doubles as the owner key.
#[get("/")]
fn list_notes(admin: Admin, notes: &State<Notes>) -> Json<NoteVector> {
    Json(notes.get_by_user(admin.token()))
}

#[get("/<id>")]
fn get_note(_admin: Admin, id: NoteId, notes: &State<Notes>) -> Result<Json<Note>, status::NotFound<String>> {
    id.value()
        .and_then(|key| notes.get_by_id(key))
        .map(Json)
        .ok_or_else(|| status::NotFound(format!("Note with ID {} was not found.", id)))
}

#[put("/<id>", data = "<note>")]
fn replace_note(
    _admin: Admin,
    id: NoteId,
    notes: &State<Notes>,
    note: NoteBody<NoteInput>,
) -> Result<status::NoContent, status::NotFound<String>> {
    let existing = find_note(notes, id)?;
    let NoteInput { title, content, user } = note.into_inner();
    store_update(notes, existing.id, title, content, user);

    Ok(status::NoContent)
}

#[patch("/<id>", data = "<patch>")]
fn patch_note(
    _admin: Admin,
    id: NoteId,
    notes: &State<Notes>,
    patch: NoteBody<NotePatch>,
) -> Result<status::NoContent, status::NotFound<String>> {
    let existing = find_note(notes, id)?;
    let NoteInput { title, content, user } = patch.into_inner().apply(&existing);
    store_update(notes, existing.id, title, content, user);

    Ok(status::NoContent)
}

#[delete("/<id>")]
fn delete_note(_admin: Admin, id: NoteId, notes: &State<Notes>) -> Result<status::NoContent, status::NotFound<String>> {
    let existing = find_note(notes, id)?;
    if notes.remove_by_id(existing.id) {
        info!("Deleted note {}", existing.id);
    }

    Ok(status::NoContent)
}

/// CORS preflight. Answers without an `Admin` guard since browsers send no credentials here.
#[options("/<_..>")]
fn preflight() -> Status {
    Status::Ok
}

// Catchers ////////////////////////////////////////////////////////////////////////////////////////

#[catch(401)]
fn unauthorized() -> &'static str {
    "Unauthorized"
}

#[catch(403)]
fn forbidden() -> &'static str {
    "Forbidden"
}

#[catch(500)]
fn internal_error() -> &'static str {
    "Internal Server Error"
}

// Store helpers ///////////////////////////////////////////////////////////////////////////////////

fn find_note(notes: &Notes, id: NoteId) -> Result<Note, status::NotFound<String>> {
    id.value()
        .and_then(|key| notes.get_by_id(key))
        .ok_or_else(|| status::NotFound(format!("Die Notiz mit ID {} wurde nicht gefunden.", id)))
}

// Lookup and update are separate calls; a concurrent delete in between makes this a no-op.
fn store_update(notes: &Notes, id: i64, title: String, content: String, user: String) {
    if !notes.update(id, title, content, user) {
        warn!("Note {} disappeared before it could be updated", id);
    }
}
