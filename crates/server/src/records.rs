//! Income and expense API endpoints.
//!
//! Both kinds share the same handlers; the router injects the
//! [`RecordKind`] of the mounted collection as an extension.

use api_types::record::{
    Message, ReceiptView, RecordKind as ApiKind, RecordList, RecordView,
};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::Field},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use engine::{
    CreateRecordCmd, MoneyCents, Receipt, ReceiptUpload, Record, RecordKind, RecordPatch,
    UpdateRecordCmd,
};

use crate::{ServerError, server::Identity, server::ServerState};

fn map_kind(kind: RecordKind) -> ApiKind {
    match kind {
        RecordKind::Income => ApiKind::Income,
        RecordKind::Expense => ApiKind::Expense,
    }
}

fn receipt_view(receipt: Receipt) -> ReceiptView {
    ReceiptView {
        id: receipt.id,
        file_name: receipt.file_name,
        locator: receipt.locator,
        mime_type: receipt.mime_type,
        uploaded_by: receipt.uploaded_by,
        checksum: receipt.checksum,
        created_at: receipt.created_at,
        updated_at: receipt.updated_at,
    }
}

fn record_view(record: Record) -> RecordView {
    RecordView {
        id: record.id,
        kind: map_kind(record.kind),
        amount: record.amount.to_string(),
        amount_minor: record.amount.cents(),
        description: record.description,
        date: record.date,
        record_type: record.record_type.as_str().to_string(),
        created_by: record.created_by,
        created_at: record.created_at,
        updated_at: record.updated_at,
        receipt: record.receipt.map(receipt_view),
    }
}

/// Fields of a create/update multipart body. Every field is optional here;
/// create checks the required ones.
#[derive(Debug, Default)]
struct RecordForm {
    amount: Option<MoneyCents>,
    description: Option<String>,
    record_type: Option<String>,
    date: Option<DateTime<Utc>>,
    receipt: Option<ReceiptUpload>,
}

fn multipart_error(err: impl std::fmt::Display) -> ServerError {
    tracing::debug!("invalid multipart body: {err}");
    ServerError::Generic(format!("invalid multipart body: {err}"))
}

async fn read_text(field: Field<'_>) -> Result<String, ServerError> {
    field.text().await.map_err(multipart_error)
}

async fn read_receipt(field: Field<'_>) -> Result<ReceiptUpload, ServerError> {
    let Some(file_name) = field.file_name().map(ToOwned::to_owned) else {
        return Err(ServerError::Generic(
            "receipt must be sent as a file".to_string(),
        ));
    };
    let data = field.bytes().await.map_err(multipart_error)?;

    tracing::debug!("Received receipt '{}' that is {} bytes", file_name, data.len());

    Ok(ReceiptUpload::new(file_name, data.to_vec()))
}

/// How blank text fields are read. Updates treat them as absent, so a
/// client may send the whole form and only fill in what changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Blanks {
    Keep,
    Skip,
}

async fn parse_form(mut multipart: Multipart, blanks: Blanks) -> Result<RecordForm, ServerError> {
    let mut form = RecordForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "receipt" {
            form.receipt = Some(read_receipt(field).await?);
            continue;
        }

        let text = read_text(field).await?;
        if blanks == Blanks::Skip && text.trim().is_empty() {
            continue;
        }
        match name.as_str() {
            "amount" => form.amount = Some(text.parse()?),
            "description" => form.description = Some(text),
            "type" => form.record_type = Some(text),
            "date" => {
                let date = DateTime::parse_from_rfc3339(text.trim()).map_err(|err| {
                    ServerError::Generic(format!("invalid date {text:?}: {err}"))
                })?;
                form.date = Some(date.with_timezone(&Utc));
            }
            other => tracing::debug!("ignoring multipart field '{other}'"),
        }
    }

    Ok(form)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ServerError> {
    value.ok_or_else(|| ServerError::Generic(format!("missing field `{field}`")))
}

pub async fn create(
    Extension(kind): Extension<RecordKind>,
    Extension(identity): Extension<Identity>,
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<RecordView>), ServerError> {
    let form = parse_form(multipart, Blanks::Keep).await?;

    let mut cmd = CreateRecordCmd::new(
        required(form.amount, "amount")?,
        required(form.description, "description")?,
        required(form.record_type, "type")?,
        identity.user_id,
    );
    if let Some(date) = form.date {
        cmd = cmd.date(date);
    }
    if let Some(receipt) = form.receipt {
        cmd = cmd.receipt(receipt);
    }

    let record = state.engine.records(kind).create(cmd).await?;

    Ok((StatusCode::CREATED, Json(record_view(record))))
}

pub async fn list(
    Extension(kind): Extension<RecordKind>,
    State(state): State<ServerState>,
) -> Result<Json<RecordList>, ServerError> {
    let records = state.engine.records(kind).list().await?;

    Ok(Json(RecordList {
        records: records.into_iter().map(record_view).collect(),
    }))
}

pub async fn get(
    Extension(kind): Extension<RecordKind>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<RecordView>, ServerError> {
    let record = state.engine.records(kind).get(id).await?;
    Ok(Json(record_view(record)))
}

pub async fn update(
    Extension(kind): Extension<RecordKind>,
    Extension(identity): Extension<Identity>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<RecordView>, ServerError> {
    let form = parse_form(multipart, Blanks::Skip).await?;

    // A zero amount means "unchanged".
    let patch = RecordPatch {
        amount: form.amount.filter(|amount| !amount.is_zero()),
        description: form.description,
        record_type: form.record_type,
        date: form.date,
    };
    let mut cmd = UpdateRecordCmd::new(id, identity.user_id).patch(patch);
    if let Some(receipt) = form.receipt {
        cmd = cmd.receipt(receipt);
    }

    let record = state.engine.records(kind).update(cmd).await?;
    Ok(Json(record_view(record)))
}

pub async fn soft_delete(
    Extension(kind): Extension<RecordKind>,
    Extension(identity): Extension<Identity>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<Message>, ServerError> {
    state
        .engine
        .records(kind)
        .soft_delete(id, identity.user_id)
        .await?;

    Ok(Json(Message {
        message: format!("{kind} deleted"),
    }))
}

pub async fn restore(
    Extension(kind): Extension<RecordKind>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<RecordView>, ServerError> {
    let record = state.engine.records(kind).restore(id).await?;
    Ok(Json(record_view(record)))
}

pub async fn purge(
    Extension(kind): Extension<RecordKind>,
    Extension(identity): Extension<Identity>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<Message>, ServerError> {
    state.engine.records(kind).delete(id).await?;
    tracing::info!(user_id = identity.user_id, id, "{kind} permanently deleted");

    Ok(Json(Message {
        message: format!("{kind} permanently deleted"),
    }))
}
