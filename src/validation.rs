//! Checks run before anything is submitted to the backend.

use crate::error::{AppError, AppResult};
use crate::model::{Document, DocumentKind, WithholdingCertificate};

pub fn validate_document(doc: &Document) -> AppResult<()> {
    if doc.party.name.trim().is_empty() {
        return Err(AppError::validation("กรุณาเลือกลูกค้า"));
    }
    // Receipts may be issued for a lump-sum payment without line items.
    if doc.kind != DocumentKind::Receipt && doc.items.is_empty() {
        return Err(AppError::validation("กรุณาเพิ่มรายการสินค้า"));
    }
    if doc.number.trim().is_empty() {
        return Err(AppError::validation("กรุณาระบุเลขที่เอกสาร"));
    }
    Ok(())
}

pub fn validate_certificate(cert: &WithholdingCertificate) -> AppResult<()> {
    if cert.recipient_tax_id.trim().is_empty() || cert.recipient_name.trim().is_empty() {
        return Err(AppError::validation("กรุณากรอกข้อมูลผู้รับเงิน"));
    }
    if cert.items.is_empty() {
        return Err(AppError::validation("กรุณาเพิ่มรายการอย่างน้อย 1 รายการ"));
    }
    Ok(())
}

pub fn validate_email(address: &str) -> AppResult<()> {
    let address = address.trim();
    if address.is_empty() || !address.contains('@') {
        return Err(AppError::validation("กรุณากรอกอีเมลที่ถูกต้อง"));
    }
    Ok(())
}
