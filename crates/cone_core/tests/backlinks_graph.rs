use cone_core::db::open_db_in_memory;
use cone_core::{
    GraphQuery, IndexConfig, IndexRequest, IndexService, QueryService, QueryServiceError,
};
use rusqlite::Connection;

fn index(conn: &mut Connection, path: &str, content: &str, modified_at: i64) {
    IndexService::try_new(conn, IndexConfig::default())
        .unwrap()
        .index_note(&IndexRequest::new(path, content, modified_at))
        .unwrap();
}

fn seed_topic_with_backlinks(conn: &mut Connection) {
    index(conn, "topics/T.md", "# Topic\n\nthe topic itself", 1);
    index(conn, "b1.md", "[[Topic]] and [[Unrelated]]", 10);
    index(conn, "b2.md", "[[T]] [[T]] [[T]]", 5);
    index(conn, "b3.md", "[[topics/T.md]] then [[Topic|t]]", 20);
    index(conn, "b4.md", "[[T.md]]", 30);
}

#[test]
fn backlinks_are_ordered_by_count_then_recency() {
    let mut conn = open_db_in_memory().unwrap();
    seed_topic_with_backlinks(&mut conn);

    let backlinks = QueryService::try_new(&conn)
        .unwrap()
        .get_backlinks("topics/T.md")
        .unwrap();

    let order: Vec<_> = backlinks
        .iter()
        .map(|backlink| (backlink.src_note.as_str(), backlink.occurrences))
        .collect();
    assert_eq!(
        order,
        vec![("b2.md", 3), ("b3.md", 2), ("b4.md", 1), ("b1.md", 1)]
    );
    assert_eq!(backlinks[0].src_title.as_deref(), Some("b2"));
    assert_eq!(backlinks[0].src_path.as_deref(), Some("b2.md"));
    assert_eq!(backlinks[1].link_text, "topics/T.md");
}

#[test]
fn backlinks_match_every_name_a_note_answers_to() {
    let mut conn = open_db_in_memory().unwrap();
    // Indexed before the target exists, so every edge is a raw forward reference.
    index(&mut conn, "by_title.md", "[[Topic]]", 1);
    index(&mut conn, "by_stem.md", "[[T]]", 2);
    index(&mut conn, "by_name.md", "[[T.md]]", 3);
    index(&mut conn, "by_path.md", "[[topics/T.md]]", 4);
    index(&mut conn, "other.md", "[[Topics]]", 5);
    index(&mut conn, "topics/T.md", "# Topic", 6);

    let backlinks = QueryService::try_new(&conn)
        .unwrap()
        .get_backlinks("topics/T.md")
        .unwrap();

    let mut sources: Vec<_> = backlinks
        .iter()
        .map(|backlink| backlink.src_note.as_str())
        .collect();
    sources.sort_unstable();
    assert_eq!(
        sources,
        vec!["by_name.md", "by_path.md", "by_stem.md", "by_title.md"]
    );
}

#[test]
fn unknown_note_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let query = QueryService::try_new(&conn).unwrap();

    assert!(matches!(
        query.get_backlinks("missing.md"),
        Err(QueryServiceError::NoteNotFound(_))
    ));
    assert!(matches!(
        query.get_note_info("missing.md"),
        Err(QueryServiceError::NoteNotFound(_))
    ));
    assert!(matches!(
        query.list_chunks("missing.md"),
        Err(QueryServiceError::NoteNotFound(_))
    ));
    assert!(matches!(
        query.get_note_info("   "),
        Err(QueryServiceError::InvalidPath(_))
    ));
}

#[test]
fn note_info_combines_headings_backlinks_and_outbound_links() {
    let mut conn = open_db_in_memory().unwrap();
    seed_topic_with_backlinks(&mut conn);
    index(
        &mut conn,
        "topics/T.md",
        "# Topic\n\n## First\n\nsee [[b4]] and [[Elsewhere]]\n\n## Second",
        40,
    );

    let info = QueryService::try_new(&conn)
        .unwrap()
        .get_note_info("topics/T.md")
        .unwrap();

    assert_eq!(info.note.title, "Topic");
    assert_eq!(info.note.modified_at, 40);
    let headings: Vec<_> = info
        .headings
        .iter()
        .map(|heading| (heading.text.as_str(), heading.level))
        .collect();
    assert_eq!(headings, vec![("Topic", 1), ("First", 2), ("Second", 2)]);
    assert_eq!(info.backlinks.len(), 4);
    let outbound: Vec<_> = info
        .outbound_links
        .iter()
        .map(|link| link.dst_note.as_str())
        .collect();
    assert_eq!(outbound, vec!["b4.md", "Elsewhere"]);
}

#[test]
fn graph_returns_recent_nodes_and_filtered_edges() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "n2.md", "two", 2);
    index(&mut conn, "n3.md", "three [[ghost]]", 3);
    index(&mut conn, "n1.md", "[[n2]] [[n2]] [[n3]]", 1);
    let query = QueryService::try_new(&conn).unwrap();

    let graph = query
        .get_graph(GraphQuery {
            limit: Some(2),
            min_degree: 0,
        })
        .unwrap();
    let nodes: Vec<_> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(nodes, vec!["n3.md", "n2.md"]);
    assert_eq!(graph.nodes[0].title, "n3");
    assert_eq!(graph.nodes[0].word_count, 2);
    let edges: Vec<_> = graph
        .edges
        .iter()
        .map(|edge| (edge.source.as_str(), edge.target.as_str(), edge.occurrences))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("n1.md", "n2.md", 2),
            ("n1.md", "n3.md", 1),
            ("n3.md", "ghost", 1),
        ]
    );

    let strong = query
        .get_graph(GraphQuery {
            limit: None,
            min_degree: 2,
        })
        .unwrap();
    assert_eq!(strong.nodes.len(), 3);
    assert_eq!(strong.edges.len(), 1);
    assert_eq!(strong.edges[0].target, "n2.md");
}

#[test]
fn graph_returns_exactly_the_requested_node_count() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "a.md", "a", 1);
    index(&mut conn, "b.md", "b [[a]]", 2);
    index(&mut conn, "c.md", "c", 3);
    let query = QueryService::try_new(&conn).unwrap();

    for (limit, expected) in [(0, 0), (1, 1), (2, 2), (3, 3), (10, 3), (u32::MAX, 3)] {
        let graph = query
            .get_graph(GraphQuery {
                limit: Some(limit),
                min_degree: 1,
            })
            .unwrap();
        assert_eq!(graph.nodes.len(), expected, "limit {limit}");
    }

    let none = query
        .get_graph(GraphQuery {
            limit: Some(0),
            min_degree: 1,
        })
        .unwrap();
    assert_eq!(none.edges.len(), 1);
}

#[test]
fn graph_breaks_recency_ties_by_note_id() {
    let mut conn = open_db_in_memory().unwrap();
    index(&mut conn, "b.md", "b", 7);
    index(&mut conn, "a.md", "a", 7);
    index(&mut conn, "c.md", "c", 1);

    let graph = QueryService::try_new(&conn)
        .unwrap()
        .get_graph(GraphQuery::default())
        .unwrap();
    let nodes: Vec<_> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(nodes, vec!["a.md", "b.md", "c.md"]);
    assert!(graph.edges.is_empty());
}

#[test]
fn empty_store_has_empty_graph() {
    let conn = open_db_in_memory().unwrap();
    let graph = QueryService::try_new(&conn)
        .unwrap()
        .get_graph(GraphQuery::default())
        .unwrap();
    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());
}
