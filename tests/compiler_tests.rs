use xql_lang::{
    AggregateSpec, CompileError, FilterSpec, SortSpec, Value, XqlNode, compile,
    compile_with_limit, has_modifier_operations,
};

fn filters(pairs: Vec<(&str, Value)>) -> FilterSpec {
    FilterSpec::from_pairs(pairs).unwrap()
}

// ============================================================================
// Filter clauses
// ============================================================================

#[test]
fn test_basic_filter_compile() {
    let node = XqlNode::new("users").filters(filters(vec![
        ("age:gte", Value::Integer(18)),
        ("city:in", Value::from(vec!["NY", "LA"])),
    ]));

    let query = compile(&node).unwrap();
    assert_eq!(
        query.text,
        "FOR doc IN @@collection_1\n\
         FILTER (doc.age >= @age_2)\n\
         FILTER (doc.city IN @city_3)\n\
         LIMIT @offset_1, @limit_1\n\
         RETURN UNSET_RECURSIVE(doc, ['_rev', '_old_rev'])\n"
    );

    assert_eq!(query.bind_vars.get("age_2"), Some(&Value::Integer(18)));
    assert_eq!(
        query.bind_vars.get("city_3"),
        Some(&Value::from(vec!["NY", "LA"]))
    );
    assert_eq!(
        query.bind_vars.get("@collection_1"),
        Some(&Value::from("users"))
    );
    assert_eq!(query.bind_vars.get("offset_1"), Some(&Value::Integer(0)));
    assert_eq!(query.bind_vars.get("limit_1"), Some(&Value::Integer(10)));
}

#[test]
fn test_default_operator_is_eq() {
    let node = XqlNode::new("users").filters(filters(vec![("name", Value::from("ada"))]));
    let query = compile(&node).unwrap();
    assert!(query.text.contains("doc.name == @name_2"));
}

#[test]
fn test_operator_lookup_is_case_insensitive() {
    let mut spec = FilterSpec::new();
    spec.push("age:$GTE", 18).unwrap();
    spec.push("city:In", vec!["NY"]).unwrap();
    let query = compile(&XqlNode::new("users").filters(spec)).unwrap();
    assert!(query.text.contains("doc.age >= @age_2"));
    assert!(query.text.contains("doc.city IN @city_3"));
}

#[test]
fn test_unknown_operator_fails_closed() {
    let mut spec = FilterSpec::new();
    let err = spec.push("age:gnarly", 18).unwrap_err();
    assert_eq!(err, CompileError::UnknownOperator("gnarly".to_string()));
}

#[test]
fn test_unknown_logic_key_is_rejected() {
    let err = FilterSpec::from_json(&serde_json::json!({
        "$nor": [{"a": 1}]
    }))
    .unwrap_err();
    assert_eq!(err, CompileError::UnknownLogicKey("$nor".to_string()));

    // logic keys are not field paths in the builder form either
    let err = FilterSpec::new().with("$or", 1).unwrap_err();
    assert_eq!(err, CompileError::UnknownLogicKey("$or".to_string()));
}

#[test]
fn test_or_groups_join_with_or() {
    let spec = FilterSpec::from_json(&serde_json::json!({
        "$or": [
            {"city:eq": "NY", "age:gte": 21},
            {"city:eq": "LA"}
        ]
    }))
    .unwrap();

    let query = compile(&XqlNode::new("users").filters(spec)).unwrap();
    assert!(query.text.contains(
        "FILTER ((doc.city == @city_2 AND doc.age >= @age_3) OR (doc.city == @city_4))"
    ));
}

#[test]
fn test_or_mapping_form_fans_out_per_pair() {
    let spec = FilterSpec::from_json(&serde_json::json!({
        "$or": {"city": "NY", "age:gte": 30}
    }))
    .unwrap();

    let query = compile(&XqlNode::new("users").filters(spec)).unwrap();
    assert!(query
        .text
        .contains("FILTER ((doc.city == @city_2) OR (doc.age >= @age_3))"));
}

#[test]
fn test_between_lowers_to_two_comparisons() {
    let node = XqlNode::new("users").filters(filters(vec![(
        "age:between",
        Value::from(vec![18i64, 30]),
    )]));
    let query = compile(&node).unwrap();
    assert!(query
        .text
        .contains("doc.age >= @age_gte_2 AND doc.age <= @age_lte_2"));
    assert_eq!(query.bind_vars.get("age_gte_2"), Some(&Value::Integer(18)));
    assert_eq!(query.bind_vars.get("age_lte_2"), Some(&Value::Integer(30)));
}

#[test]
fn test_between_requires_two_values() {
    let node =
        XqlNode::new("users").filters(filters(vec![("age:between", Value::from(vec![18i64]))]));
    assert_eq!(compile(&node).unwrap_err(), CompileError::BetweenOperands);

    let node = XqlNode::new("users").filters(filters(vec![("age:between", Value::Integer(18))]));
    assert_eq!(compile(&node).unwrap_err(), CompileError::BetweenOperands);
}

#[test]
fn test_in_requires_array_operand() {
    let node = XqlNode::new("users").filters(filters(vec![("city:in", Value::from("NY"))]));
    assert_eq!(
        compile(&node).unwrap_err(),
        CompileError::InvalidOperand {
            operator: "in",
            expected: "an array operand",
        }
    );
}

#[test]
fn test_reverse_operand_operators_swap_sides() {
    let node = XqlNode::new("users").filters(filters(vec![
        ("tags:includes", Value::from("rust")),
        ("tags:xincludes", Value::from("cobol")),
    ]));
    let query = compile(&node).unwrap();
    assert!(query.text.contains("@tags_2 IN doc.tags"));
    assert!(query.text.contains("@tags_3 NOT IN doc.tags"));
}

#[test]
fn test_pattern_operators_wrap_bound_value() {
    let node = XqlNode::new("users").filters(filters(vec![
        ("email:endswith", Value::from(".io")),
        ("name:startswith", Value::from("a")),
        ("bio:contains", Value::from("rust")),
    ]));
    let query = compile(&node).unwrap();
    assert!(query.text.contains("doc.email LIKE @email_2"));
    assert_eq!(query.bind_vars.get("email_2"), Some(&Value::from("%.io")));
    assert_eq!(query.bind_vars.get("name_3"), Some(&Value::from("a%")));
    assert_eq!(query.bind_vars.get("bio_4"), Some(&Value::from("%rust%")));
}

#[test]
fn test_null_and_existence_bind_nothing() {
    let node = XqlNode::new("users").filters(filters(vec![
        ("deleted_at:null", Value::Boolean(true)),
        ("profile.bio:exists", Value::Boolean(true)),
        ("legacy:notexists", Value::Boolean(true)),
    ]));
    let query = compile(&node).unwrap();
    assert!(query.text.contains("doc.deleted_at == null"));
    assert!(query.text.contains("HAS(doc.profile, \"bio\")"));
    assert!(query.text.contains("NOT HAS(doc, \"legacy\")"));
    // only the paging and collection vars bind
    assert_eq!(query.bind_vars.len(), 3);
}

#[test]
fn test_literal_reference_renders_raw_identifier() {
    let node = XqlNode::new("applications").alias("app").filters(filters(vec![(
        "job_id",
        Value::from("#post._key"),
    )]));
    let query = compile(&node).unwrap();
    assert!(query.text.contains("app.job_id == post._key"));
    assert!(!query.bind_vars.keys().any(|k| k.starts_with("job_id")));
}

#[test]
fn test_literal_reference_to_caller_bind_var() {
    let node =
        XqlNode::new("users").filters(filters(vec![("team", Value::from("#@team_id"))]));
    let query = compile(&node).unwrap();
    assert!(query.text.contains("doc.team == @team_id"));

    // the caller supplies the referenced variable out-of-band
    let query = query.with_vars(
        [("team_id".to_string(), Value::from("teams/7"))]
            .into_iter()
            .collect(),
    );
    assert_eq!(query.bind_vars.get("team_id"), Some(&Value::from("teams/7")));
}

// ============================================================================
// Joins and bind-variable uniqueness
// ============================================================================

#[test]
fn test_join_compiles_to_let_subquery() {
    let join = XqlNode::new("applications")
        .alias("app")
        .filters(filters(vec![("job_id", Value::from("#post._key"))]));
    let node = XqlNode::new("job_posts")
        .alias("post")
        .filters(filters(vec![("status", Value::from("open"))]))
        .join(join);

    let query = compile(&node).unwrap();
    assert!(query.text.contains("LET app = (\nFOR app IN @@collection_3"));
    assert!(query.bind_vars.contains_key("@collection_1"));
    assert!(query.bind_vars.contains_key("@collection_3"));
}

#[test]
fn test_sibling_joins_never_collide_on_bind_names() {
    // same filter path everywhere: only the arena suffix distinguishes them
    let node = XqlNode::new("a")
        .filters(filters(vec![("v", Value::Integer(1))]))
        .join(XqlNode::new("b").alias("b").filters(filters(vec![("v", Value::Integer(2))])))
        .join(XqlNode::new("c").alias("c").filters(filters(vec![("v", Value::Integer(3))])));

    let query = compile(&node).unwrap();
    let v_keys: Vec<&String> = query
        .bind_vars
        .keys()
        .filter(|k| k.starts_with("v_"))
        .collect();
    assert_eq!(v_keys.len(), 3);
    assert_eq!(query.bind_vars.get("v_2"), Some(&Value::Integer(1)));
    assert_eq!(query.bind_vars.get("v_4"), Some(&Value::Integer(2)));
    assert_eq!(query.bind_vars.get("v_6"), Some(&Value::Integer(3)));
}

#[test]
fn test_nested_join_bind_names_stay_unique() {
    let inner = XqlNode::new("grandchild")
        .alias("gc")
        .filters(filters(vec![("v", Value::from("#child.v"))]));
    let child = XqlNode::new("child")
        .alias("child")
        .filters(filters(vec![("v", Value::Integer(1))]))
        .join(inner);
    let node = XqlNode::new("root")
        .filters(filters(vec![("v", Value::Integer(0))]))
        .join(child);

    let query = compile(&node).unwrap();
    let collections: Vec<&String> = query
        .bind_vars
        .keys()
        .filter(|k| k.starts_with("@collection_"))
        .collect();
    assert_eq!(collections.len(), 3);

    // compiling twice yields identical names: the arena is deterministic
    let again = compile(&node).unwrap();
    assert_eq!(query.text, again.text);
    assert_eq!(query.bind_vars, again.bind_vars);
}

// ============================================================================
// Sort, pagination, projection modes
// ============================================================================

#[test]
fn test_sort_clause() {
    let sort = SortSpec::parse_entries(["age:desc", "name"]).unwrap();
    let node = XqlNode::new("users").sort(sort);
    let query = compile(&node).unwrap();
    assert!(query.text.contains("SORT doc.age DESC, doc.name ASC\n"));
}

#[test]
fn test_offset_derives_from_page() {
    let node = XqlNode::new("users").page(3).limit(20);
    let query = compile(&node).unwrap();
    assert_eq!(query.bind_vars.get("offset_1"), Some(&Value::Integer(40)));
    assert_eq!(query.bind_vars.get("limit_1"), Some(&Value::Integer(20)));
    assert_eq!(query.page, 3);
    assert_eq!(query.per_page, 20);
}

#[test]
fn test_explicit_offset_wins_over_page() {
    let node = XqlNode::new("users").page(3).limit(20).offset(7);
    let query = compile(&node).unwrap();
    assert_eq!(query.bind_vars.get("offset_1"), Some(&Value::Integer(7)));
}

#[test]
fn test_limit_clamps_to_maximum() {
    let node = XqlNode::new("users").limit(5000);
    let query = compile(&node).unwrap();
    assert_eq!(query.bind_vars.get("limit_1"), Some(&Value::Integer(1000)));

    let query = compile_with_limit(&XqlNode::new("users").limit(500), 100).unwrap();
    assert_eq!(query.bind_vars.get("limit_1"), Some(&Value::Integer(100)));
}

#[test]
fn test_return_count_wraps_query_and_skips_limit() {
    let node = XqlNode::new("users")
        .filters(filters(vec![("active", Value::Boolean(true))]))
        .return_count();
    let query = compile(&node).unwrap();
    assert!(query.text.starts_with("RETURN LENGTH(\n"));
    assert!(!query.text.contains("LIMIT"));
    assert!(!query.bind_vars.contains_key("offset_1"));
}

#[test]
fn test_return_count_takes_priority_over_aggregation() {
    let aggregations =
        AggregateSpec::from_json(&serde_json::json!({"total:count": true})).unwrap();
    let node = XqlNode::new("users").aggregations(aggregations).return_count();
    let query = compile(&node).unwrap();
    assert!(query.text.starts_with("RETURN LENGTH(\n"));
    assert!(!query.text.contains("COLLECT AGGREGATE"));
}

#[test]
fn test_skip_limit_omits_pagination_clause() {
    let node = XqlNode::new("users").skip_limit();
    let query = compile(&node).unwrap();
    assert!(!query.text.contains("LIMIT"));
    assert!(query.text.contains("RETURN UNSET_RECURSIVE"));
}

#[test]
fn test_partial_query_has_no_final_return() {
    let node = XqlNode::new("users").partial();
    let query = compile(&node).unwrap();
    assert!(!query.text.contains("RETURN"));
}

#[test]
fn test_projection_and_unset_keys() {
    let node = XqlNode::new("users")
        .projection("MERGE(doc, {x: 1})")
        .unset_keys(["_secret"]);
    let query = compile(&node).unwrap();
    assert!(query.text.contains(
        "RETURN UNSET_RECURSIVE(MERGE(doc, {x: 1}), ['_rev', '_old_rev', '_secret'])"
    ));
}

#[test]
fn test_aggregations_render_grouped_reductions() {
    let aggregations = AggregateSpec::from_json(&serde_json::json!({
        "total:count": true,
        "largest:max": "size",
        "combined:sum": "size"
    }))
    .unwrap();
    let node = XqlNode::new("objects").aggregations(aggregations);
    let query = compile(&node).unwrap();
    assert!(query.text.contains(
        "COLLECT AGGREGATE total = LENGTH(1), largest = MAX(doc.size), combined = SUM(doc.size)\n\
         RETURN { total, largest, combined }"
    ));
    assert!(!query.text.contains("UNSET_RECURSIVE"));
}

#[test]
fn test_typed_builders_mirror_the_mapping_forms() {
    use xql_lang::{AggregateOp, Direction};

    let node = XqlNode::new("objects")
        .filters(
            FilterSpec::new()
                .with("status", "ok")
                .unwrap()
                .with_any(vec![
                    FilterSpec::new().with("size:gte", 100).unwrap(),
                    FilterSpec::new().with("pinned", true).unwrap(),
                ]),
        )
        .sort(SortSpec::new().by("size", Direction::Descending))
        .aggregations(
            AggregateSpec::new()
                .with("total", AggregateOp::Count, None)
                .with("largest", AggregateOp::Max, Some("size".to_string())),
        );

    let query = compile(&node).unwrap();
    assert!(query.text.contains("FILTER (doc.status == @status_2)"));
    assert!(query
        .text
        .contains("FILTER ((doc.size >= @size_3) OR (doc.pinned == @pinned_4))"));
    assert!(query.text.contains("SORT doc.size DESC"));
    assert!(query.text.contains(
        "COLLECT AGGREGATE total = LENGTH(1), largest = MAX(doc.size)"
    ));
}

// ============================================================================
// Mapping-form parsing and helpers
// ============================================================================

#[test]
fn test_node_from_json_with_aliases() {
    let node = XqlNode::from_json(&serde_json::json!({
        "FETCH": "job_posts",
        "AS": "post",
        "FILTERS": {"status": "open"},
        "SORT": ["_created_at:desc"],
        "LIMIT": 5,
        "SUBQUERIES": [{
            "FROM": "applications",
            "ALIAS": "app",
            "FILTERS": {"job_id": "#post._key"}
        }]
    }))
    .unwrap();

    assert_eq!(node.source, "job_posts");
    assert_eq!(node.effective_alias(), "post");
    assert_eq!(node.joins.len(), 1);

    let query = compile(&node).unwrap();
    assert!(query.text.contains("FOR post IN @@collection_1"));
    assert!(query.text.contains("app.job_id == post._key"));
}

#[test]
fn test_node_from_json_requires_source() {
    let err = XqlNode::from_json(&serde_json::json!({"ALIAS": "doc"})).unwrap_err();
    assert!(matches!(err, CompileError::InvalidSpec(_)));
}

#[test]
fn test_collections_lists_the_whole_tree() {
    let node = XqlNode::new("a")
        .join(XqlNode::new("b").join(XqlNode::new("c")))
        .join(XqlNode::new("b"));
    assert_eq!(node.collections(), vec!["a", "b", "c"]);
}

#[test]
fn test_filter_paths() {
    let spec = FilterSpec::from_json(&serde_json::json!({
        "name": "x",
        "age:gte": 1,
        "$or": [{"city:eq": "NY"}, {"age:lt": 99}]
    }))
    .unwrap();
    assert_eq!(spec.paths(), vec!["age", "city", "name"]);
}

#[test]
fn test_modifier_detection() {
    assert!(has_modifier_operations("FOR d IN users REMOVE d IN users"));
    assert!(has_modifier_operations("upsert {x:1} insert {} update {} in c"));
    let query = compile(&XqlNode::new("users")).unwrap();
    assert!(!has_modifier_operations(&query.text));
}

#[test]
fn test_macro_values_never_reach_query_text() {
    let node = XqlNode::new("events")
        .filters(filters(vec![("created_at:gte", Value::from("[[@T:-1d;]]"))]));
    let query = compile(&node).unwrap();
    assert!(!query.text.contains("[[@"));
    let bound = query.bind_vars.get("created_at_2").unwrap();
    match bound {
        Value::String(s) => assert!(!s.contains("[[@")),
        other => panic!("expected a computed timestamp string, got {:?}", other),
    }
}

#[test]
fn test_wildcard_path_passes_through_to_query_text() {
    let node = XqlNode::new("users").filters(filters(vec![(
        "friends[*].city:includes",
        Value::from("NY"),
    )]));
    let query = compile(&node).unwrap();
    assert!(query.text.contains("IN doc.friends[*].city"));
}

#[test]
fn test_operator_metadata() {
    use xql_lang::Operator;
    assert!(Operator::Includes.reverses_operands());
    assert!(!Operator::In.reverses_operands());
    assert!(Operator::Eq.takes_operand());
    assert!(!Operator::Null.takes_operand());
    assert!(!Operator::NotExists.takes_operand());
}

#[test]
fn test_compiled_query_feeds_an_executor() {
    use std::cell::RefCell;
    use xql_lang::{BindVars, QueryExecutor};

    struct Recorder {
        seen: RefCell<Vec<String>>,
    }

    impl QueryExecutor for Recorder {
        type Error = std::convert::Infallible;

        fn execute(&self, query: &str, _bind_vars: &BindVars) -> Result<Vec<Value>, Self::Error> {
            self.seen.borrow_mut().push(query.to_string());
            Ok(Vec::new())
        }
    }

    let recorder = Recorder {
        seen: RefCell::new(Vec::new()),
    };
    let query = compile(&XqlNode::new("users")).unwrap();
    let rows = recorder.execute(&query.text, &query.bind_vars).unwrap();
    assert!(rows.is_empty());
    assert_eq!(recorder.seen.borrow().len(), 1);
}

#[test]
fn test_bind_vars_json_shape() {
    let node = XqlNode::new("users").filters(filters(vec![("age:gte", Value::Integer(18))]));
    let query = compile(&node).unwrap();
    let json = query.bind_vars_json();
    assert_eq!(json["age_2"], serde_json::json!(18));
    assert_eq!(json["@collection_1"], serde_json::json!("users"));
}
