use funeral_hub_core::UploadedFile;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UPLOAD: AtomicU64 = AtomicU64::new(1);

/// PDF upload with a unique storage reference
pub fn pdf(name: &str) -> UploadedFile {
    let n = NEXT_UPLOAD.fetch_add(1, Ordering::Relaxed);
    UploadedFile {
        storage_ref: format!("uploads/{:06}/{}", n, name),
        original_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        size_bytes: 48_000,
    }
}

pub fn death_declaration() -> UploadedFile {
    pdf("declaracao_obito.pdf")
}

pub fn faf_form() -> UploadedFile {
    pdf("faf_assinada.pdf")
}

pub fn certificate_draft() -> UploadedFile {
    pdf("minuta_certidao.pdf")
}

pub fn final_certificate() -> UploadedFile {
    pdf("certidao_obito.pdf")
}

/// Upload the upload layer could never have produced
pub fn empty_file() -> UploadedFile {
    UploadedFile {
        size_bytes: 0,
        ..pdf("empty.pdf")
    }
}
