/// One page of a listing. The server hands out the offset of the next page,
/// zero or null once the listing is exhausted.
#[derive(serde::Deserialize)]
pub(super) struct PaginatedResponse<T> {
    pub result: Vec<T>,
    #[serde(default)]
    pub next_offset: Option<usize>,
}

#[derive(serde::Serialize)]
pub(super) struct CreateZone<'a> {
    pub name: &'a str,
}
