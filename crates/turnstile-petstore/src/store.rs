//! The pet store itself. It trusts that requests already match the contract.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Method, Request, StatusCode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use turnstile::{Handler, ResponseSink};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: u64,
    pub name: String,
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewPet {
    name: String,
    tag: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: u16,
    message: &'a str,
}

#[derive(Default)]
pub struct PetStore {
    pets: Mutex<Vec<Pet>>,
    next_id: AtomicU64,
}

impl PetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, request: &Request<Bytes>, sink: &mut dyn ResponseSink) {
        let limit = request
            .uri()
            .query()
            .and_then(|q| {
                q.split('&')
                    .filter_map(|pair| pair.strip_prefix("limit="))
                    .find_map(|v| v.parse::<usize>().ok())
            })
            .unwrap_or(usize::MAX);

        let pets: Vec<Pet> = self.pets.lock().iter().take(limit).cloned().collect();
        // An empty store serializes as `null`, which the contract's array schema
        // rejects; response validation turns it into the canned error
        let listing = (!pets.is_empty()).then_some(pets);
        write_json(sink, StatusCode::OK, &listing);
    }

    fn create(&self, request: &Request<Bytes>, sink: &mut dyn ResponseSink) {
        let new_pet: NewPet = match serde_json::from_slice(request.body()) {
            Ok(pet) => pet,
            Err(e) => {
                write_error(sink, StatusCode::BAD_REQUEST, &e.to_string());
                return;
            }
        };

        let pet = Pet {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            name: new_pet.name,
            tag: new_pet.tag,
        };
        self.pets.lock().push(pet.clone());
        tracing::debug!(id = pet.id, name = %pet.name, "pet created");

        if let Ok(location) = HeaderValue::from_str(&format!("/pets/{}", pet.id)) {
            sink.append_header(LOCATION, location);
        }
        write_json(sink, StatusCode::CREATED, &pet);
    }

    fn show(&self, id: &str, sink: &mut dyn ResponseSink) {
        let found = id
            .parse::<u64>()
            .ok()
            .and_then(|id| self.pets.lock().iter().find(|p| p.id == id).cloned());
        match found {
            Some(pet) => write_json(sink, StatusCode::OK, &pet),
            None => write_error(sink, StatusCode::NOT_FOUND, "pet not found"),
        }
    }
}

impl Handler for PetStore {
    fn serve(&self, request: &Request<Bytes>, sink: &mut dyn ResponseSink) {
        let path = request.uri().path().trim_end_matches('/');
        if let (&Method::GET, Some(id)) = (request.method(), path.strip_prefix("/pets/")) {
            return self.show(id, sink);
        }
        match (request.method(), path) {
            (&Method::GET, "/pets") => self.list(request, sink),
            (&Method::POST, "/pets") => self.create(request, sink),
            _ => write_error(sink, StatusCode::NOT_FOUND, "no such route"),
        }
    }
}

fn write_json<T: Serialize>(sink: &mut dyn ResponseSink, status: StatusCode, value: &T) {
    match serde_json::to_vec(value) {
        Ok(body) => {
            sink.append_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            sink.set_status(status);
            if let Err(e) = sink.write_body(&body) {
                tracing::debug!(error = %e, "client went away");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

fn write_error(sink: &mut dyn ResponseSink, status: StatusCode, message: &str) {
    write_json(
        sink,
        status,
        &ErrorBody {
            code: status.as_u16(),
            message,
        },
    );
}
