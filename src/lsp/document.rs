/// State for each open document
#[derive(Debug)]
pub struct DocumentState {
    pub content: String,
    pub language_id: String, // From didOpen; gates the external-fix bridge
}
