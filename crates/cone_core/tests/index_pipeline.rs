use cone_core::db::{database_stats, open_db_in_memory};
use cone_core::{
    IndexConfig, IndexRequest, IndexResult, IndexService, IndexServiceError, MetadataValue,
    NoteMetadata, QueryService, QueryServiceError, RepoError,
};
use rusqlite::Connection;

fn index(conn: &mut Connection, path: &str, content: &str, modified_at: i64) -> IndexResult {
    IndexService::try_new(conn, IndexConfig::default())
        .unwrap()
        .index_note(&IndexRequest::new(path, content, modified_at))
        .unwrap()
}

fn outbound(conn: &Connection, path: &str) -> Vec<(String, String, u32)> {
    QueryService::try_new(conn)
        .unwrap()
        .get_note_info(path)
        .unwrap()
        .outbound_links
        .into_iter()
        .map(|link| (link.dst_note, link.link_text, link.occurrences))
        .collect()
}

#[test]
fn index_derives_title_from_first_level_one_heading() {
    let mut conn = open_db_in_memory().unwrap();

    let result = index(&mut conn, "notes/a.md", "## Sub\n# Hello\nbody words here", 10);
    assert_eq!(result.note_id, "notes/a.md");
    assert_eq!(result.title, "Hello");
    assert_eq!(result.word_count, 5);
    assert_eq!(result.heading_count, 2);

    let fallback = index(&mut conn, "notes/x.md", "no headings at all", 10);
    assert_eq!(fallback.title, "x");
}

#[test]
fn index_normalizes_path_and_rejects_blank_paths() {
    let mut conn = open_db_in_memory().unwrap();

    let result = index(&mut conn, " .\\notes\\\\a.md ", "text", 1);
    assert_eq!(result.note_id, "notes/a.md");

    let err = IndexService::try_new(&mut conn, IndexConfig::default())
        .unwrap()
        .index_note(&IndexRequest::new(" ./ ", "text", 1))
        .unwrap_err();
    assert!(matches!(err, IndexServiceError::InvalidPath(_)));
}

#[test]
fn reindexing_identical_input_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let body = "# Topic\n\nintro [[Other]]\n\n## Part\n\nmore text [[Other|alias]]";

    let first = index(&mut conn, "topic.md", body, 5);
    let info_first = QueryService::try_new(&conn)
        .unwrap()
        .get_note_info("topic.md")
        .unwrap();
    let chunks_first = QueryService::try_new(&conn)
        .unwrap()
        .list_chunks("topic.md")
        .unwrap();

    let second = index(&mut conn, "topic.md", body, 5);
    let info_second = QueryService::try_new(&conn)
        .unwrap()
        .get_note_info("topic.md")
        .unwrap();
    let chunks_second = QueryService::try_new(&conn)
        .unwrap()
        .list_chunks("topic.md")
        .unwrap();

    assert_eq!(first.title, second.title);
    assert_eq!(first.word_count, second.word_count);
    assert_eq!(info_first.note, info_second.note);
    assert_eq!(info_first.outbound_links, info_second.outbound_links);

    let heading_shape = |info: &cone_core::NoteInfo| {
        info.headings
            .iter()
            .map(|heading| (heading.text.clone(), heading.level, heading.start_offset))
            .collect::<Vec<_>>()
    };
    assert_eq!(heading_shape(&info_first), heading_shape(&info_second));

    let chunk_shape = |chunks: &[cone_core::ChunkRecord]| {
        chunks
            .iter()
            .map(|chunk| {
                (
                    chunk.chunk_id.clone(),
                    chunk.start_offset,
                    chunk.end_offset,
                    chunk.text.clone(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(
        chunk_shape(chunks_first.as_slice()),
        chunk_shape(chunks_second.as_slice())
    );

    let stats = database_stats(&conn).unwrap();
    assert_eq!(stats.notes, 1);
    assert_eq!(stats.headings, 2);
    assert_eq!(stats.links, 1);
}

#[test]
fn reindex_updates_in_place_and_keeps_created_at() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "a.md", "# Old", 1);
    conn.execute("UPDATE notes SET created_at = 42 WHERE note_id = 'a.md';", [])
        .unwrap();

    index(&mut conn, "a.md", "# New\n\nmore words", 2);

    let info = QueryService::try_new(&conn)
        .unwrap()
        .get_note_info("a.md")
        .unwrap();
    assert_eq!(info.note.created_at, 42);
    assert_eq!(info.note.modified_at, 2);
    assert_eq!(info.note.title, "New");
    assert_eq!(info.headings.len(), 1);
    assert_eq!(info.headings[0].text, "New");
}

#[test]
fn duplicate_links_fold_into_one_edge_with_first_display_text() {
    let mut conn = open_db_in_memory().unwrap();

    let result = index(&mut conn, "a.md", "[[Target]] and again [[Target|Alias]]", 1);
    assert_eq!(result.link_count, 1);
    assert_eq!(
        outbound(&conn, "a.md"),
        vec![("Target".to_string(), "Target".to_string(), 2)]
    );
}

#[test]
fn forward_reference_is_repointed_only_after_reindex() {
    let mut conn = open_db_in_memory().unwrap();

    index(&mut conn, "a.md", "see [[B]]", 1);
    assert_eq!(outbound(&conn, "a.md")[0].0, "B");

    index(&mut conn, "notes/B.md", "# Bee\n\nbody", 2);
    // Stored edges are not repaired retroactively.
    assert_eq!(outbound(&conn, "a.md")[0].0, "B");

    // The stem still reaches the stored edge through backlink targets.
    let backlinks = QueryService::try_new(&conn)
        .unwrap()
        .get_backlinks("notes/B.md")
        .unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0].src_note, "a.md");

    index(&mut conn, "a.md", "see [[B]]", 3);
    assert_eq!(outbound(&conn, "a.md")[0].0, "notes/B.md");
}

#[test]
fn resolution_prefers_title_over_file_names() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "x/B.md", "# Something else", 1);
    index(&mut conn, "y/note.md", "# B", 1);

    index(&mut conn, "a.md", "[[B]] [[B.md]] [[x/B.md]]", 2);

    assert_eq!(
        outbound(&conn, "a.md"),
        vec![
            ("y/note.md".to_string(), "B".to_string(), 1),
            ("x/B.md".to_string(), "B.md".to_string(), 2),
        ]
    );
}

#[test]
fn link_to_self_resolves_within_the_same_pass() {
    let mut conn = open_db_in_memory().unwrap();

    index(&mut conn, "notes/self.md", "# Me\n\n[[Me]] [[self]]", 1);

    assert_eq!(
        outbound(&conn, "notes/self.md"),
        vec![("notes/self.md".to_string(), "Me".to_string(), 2)]
    );
}

#[test]
fn chunks_carry_nearest_heading_and_slice_the_body() {
    let mut conn = open_db_in_memory().unwrap();
    let body = format!(
        "# Top\n\n{}\n\n## Middle\n\n{}\n\ntail",
        "a".repeat(30),
        "b".repeat(30)
    );

    let result = IndexService::try_new(&mut conn, IndexConfig { max_chunk_chars: 35 })
        .unwrap()
        .index_note(&IndexRequest::new("c.md", body.as_str(), 1))
        .unwrap();

    let query = QueryService::try_new(&conn).unwrap();
    let headings = query.get_note_info("c.md").unwrap().headings;
    let chunks = query.list_chunks("c.md").unwrap();
    assert_eq!(chunks.len(), result.chunks.len());

    for chunk in &chunks {
        assert_eq!(
            &body[chunk.start_offset..chunk.start_offset + chunk.text.len()],
            chunk.text
        );
        let expected = headings
            .iter()
            .filter(|heading| heading.start_offset <= chunk.start_offset)
            .last()
            .map(|heading| heading.id);
        assert_eq!(chunk.heading_id, expected);
    }
    assert_eq!(chunks.last().unwrap().end_offset, body.len());
    assert_eq!(chunks[0].heading_id, Some(headings[0].id));
    assert_eq!(chunks.last().unwrap().heading_id, Some(headings[1].id));
}

#[test]
fn chunk_preview_is_truncated() {
    let mut conn = open_db_in_memory().unwrap();
    let body = "w".repeat(150);

    let result = index(&mut conn, "long.md", &body, 1);
    assert_eq!(result.chunks.len(), 1);
    assert_eq!(result.chunks[0].preview, format!("{}...", "w".repeat(100)));
}

#[test]
fn deleting_a_heading_nulls_chunk_reference() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "a.md", "# Head\n\nbody", 1);

    conn.execute("DELETE FROM headings WHERE note_id = 'a.md';", [])
        .unwrap();

    let chunks = QueryService::try_new(&conn)
        .unwrap()
        .list_chunks("a.md")
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].heading_id, None);
}

#[test]
fn failed_pass_leaves_prior_state_intact() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "a.md", "# First\n\n[[Old]]", 1);
    conn.execute_batch(
        "CREATE TRIGGER reject_chunks BEFORE INSERT ON chunks
         BEGIN
             SELECT RAISE(ABORT, 'chunk writes disabled');
         END;",
    )
    .unwrap();

    let err = IndexService::try_new(&mut conn, IndexConfig::default())
        .unwrap()
        .index_note(&IndexRequest::new("a.md", "# Second\n\n[[New]]", 2))
        .unwrap_err();
    assert!(matches!(err, IndexServiceError::Storage(RepoError::Db(_))));

    let info = QueryService::try_new(&conn)
        .unwrap()
        .get_note_info("a.md")
        .unwrap();
    assert_eq!(info.note.title, "First");
    assert_eq!(info.note.modified_at, 1);
    assert_eq!(info.headings[0].text, "First");
    assert_eq!(info.outbound_links[0].dst_note, "Old");
    assert_eq!(database_stats(&conn).unwrap().chunks, 1);
}

#[test]
fn metadata_is_stored_with_scalar_types() {
    let mut conn = open_db_in_memory().unwrap();
    let mut metadata = NoteMetadata::new();
    metadata.insert("draft".to_string(), MetadataValue::Bool(true));
    metadata.insert("rating".to_string(), MetadataValue::Integer(4));
    metadata.insert("weight".to_string(), MetadataValue::Float(0.5));
    metadata.insert("status".to_string(), MetadataValue::Text("open".to_string()));

    let mut request = IndexRequest::new("m.md", "body", 1);
    request.metadata = metadata.clone();
    IndexService::try_new(&mut conn, IndexConfig::default())
        .unwrap()
        .index_note(&request)
        .unwrap();

    let info = QueryService::try_new(&conn)
        .unwrap()
        .get_note_info("m.md")
        .unwrap();
    assert_eq!(info.note.metadata, metadata);
}

#[test]
fn remove_cascades_owned_rows_and_keeps_inbound_links() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "a.md", "# A\n\n[[b]]", 1);
    index(&mut conn, "b.md", "# B\n\n[[a]]", 2);

    IndexService::try_new(&mut conn, IndexConfig::default())
        .unwrap()
        .remove_note("a.md")
        .unwrap();

    let stats = database_stats(&conn).unwrap();
    assert_eq!(stats.notes, 1);
    assert_eq!(stats.headings, 1);
    assert_eq!(stats.links, 1);
    assert_eq!(stats.chunks, 1);
    assert_eq!(outbound(&conn, "b.md")[0].0, "a.md");

    let err = QueryService::try_new(&conn)
        .unwrap()
        .get_note_info("a.md")
        .unwrap_err();
    assert!(matches!(err, QueryServiceError::NoteNotFound(_)));

    let err = IndexService::try_new(&mut conn, IndexConfig::default())
        .unwrap()
        .remove_note("a.md")
        .unwrap_err();
    assert!(matches!(err, IndexServiceError::NoteNotFound(id) if id == "a.md"));
}
