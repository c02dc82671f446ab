use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use card_store::Store;
use clap::{Parser, Subcommand};
use client_core::{
    editor::DEFAULT_PREVIEW_HEIGHT, load_settings, media_uploader_from_settings, CardLocks,
    EditorProps, FieldPhotoEditor, FormSlot, HttpCardBackend, PhotoOutcome, SelectedFile,
};
use shared::domain::{CardId, PhotoRef};
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides `api_base_url` from settings.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    card_id: i64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    EditField {
        #[arg(long)]
        field: String,
        #[arg(long, default_value = "")]
        value: String,
    },
    AddPhoto {
        #[arg(long)]
        photo_field: String,
        #[arg(long)]
        file: PathBuf,
    },
    ChangePhoto {
        #[arg(long)]
        photo_field: String,
        #[arg(long)]
        current_photo: String,
        #[arg(long)]
        file: PathBuf,
    },
    DeletePhoto {
        #[arg(long)]
        photo_field: String,
        #[arg(long)]
        current_photo: String,
    },
    PreviewUrl {
        #[arg(long)]
        photo: String,
        #[arg(long, default_value_t = DEFAULT_PREVIEW_HEIGHT)]
        height: u32,
    },
}

fn props_for(card_id: CardId, command: &Command) -> EditorProps {
    let (field, photo_field, photo) = match command {
        Command::EditField { field, .. } => (field.clone(), String::new(), String::new()),
        Command::AddPhoto { photo_field, .. } => {
            (String::new(), photo_field.clone(), String::new())
        }
        Command::ChangePhoto {
            photo_field,
            current_photo,
            ..
        }
        | Command::DeletePhoto {
            photo_field,
            current_photo,
        } => (String::new(), photo_field.clone(), current_photo.clone()),
        Command::PreviewUrl { photo, .. } => (String::new(), String::new(), photo.clone()),
    };
    EditorProps {
        card_id,
        field_name: field.clone(),
        field,
        photo_field,
        photo: PhotoRef::from_prop(&photo),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url.clone() {
        settings.api_base_url = api_url;
    }

    info!(
        "cli: card={} api_base_url={}",
        args.card_id, settings.api_base_url
    );
    let backend = Arc::new(HttpCardBackend::from_settings(&settings)?);
    let media = media_uploader_from_settings(&settings, settings.build_http_client()?)?;
    let store = Arc::new(Store::default());
    let editor = FieldPhotoEditor::new(
        props_for(CardId(args.card_id), &args.command),
        backend,
        media,
        store,
        CardLocks::new(),
    );

    match args.command {
        Command::EditField { value, .. } => {
            editor.submit_edit_field(value).await?;
            println!("Field update sent for card {}", args.card_id);
        }
        Command::AddPhoto { file, .. } => {
            editor
                .select_file(FormSlot::AddPhoto, SelectedFile::from_path(&file).await?)
                .await;
            report_photo(editor.submit_add_photo().await?);
        }
        Command::ChangePhoto { file, .. } => {
            editor
                .select_file(FormSlot::ChangePhoto, SelectedFile::from_path(&file).await?)
                .await;
            report_photo(editor.submit_change_photo().await?);
        }
        Command::DeletePhoto { .. } => {
            editor.handle_delete_photo().await?;
            println!("Photo removed from card {}", args.card_id);
        }
        Command::PreviewUrl { height, .. } => match editor.preview_url(height) {
            Some(url) => println!("{url}"),
            None => println!("No preview available (empty photo or no media cloud configured)"),
        },
    }

    Ok(())
}

fn report_photo(outcome: PhotoOutcome) {
    match outcome {
        PhotoOutcome::NothingSelected => println!("No file selected; nothing to do"),
        PhotoOutcome::Committed(public_id) => println!("Photo stored as {public_id}"),
    }
}
