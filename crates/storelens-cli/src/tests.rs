use super::*;
use crate::metrics::MetricView;
use crate::products::FieldArgs;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["storelens"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["storelens", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["storelens", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_ingest_products_with_follow_up_view() {
    let cli = Cli::try_parse_from([
        "storelens",
        "ingest",
        "products",
        "feed.csv",
        "--then",
        "top-margin",
        "--limit",
        "1",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Ingest {
        command:
            IngestCommands::Products {
                path,
                then,
                options,
            },
    }) = cli.command
    else {
        panic!("expected ingest products");
    };
    assert_eq!(path.to_str(), Some("feed.csv"));
    assert_eq!(then, Some(MetricView::TopMargin));
    assert_eq!(options.limit, 1);
}

#[test]
fn parses_ingest_analytics_from_stdin() {
    let cli = Cli::try_parse_from(["storelens", "ingest", "analytics", "-"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Ingest {
            command: IngestCommands::Analytics { ref path, then: None, .. }
        }) if path.to_str() == Some("-")
    ));
}

#[test]
fn ingest_requires_a_path() {
    assert!(Cli::try_parse_from(["storelens", "ingest", "products"]).is_err());
}

#[test]
fn parses_products_list_filters() {
    let cli = Cli::try_parse_from([
        "storelens",
        "products",
        "list",
        "--category",
        "Tools",
        "--min-price",
        "10",
        "--max-price",
        "20",
        "--min-rating",
        "4",
        "--location",
        "Berlin",
        "--limit",
        "5",
        "--offset",
        "10",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Products {
        command: ProductCommands::List(args),
    }) = cli.command
    else {
        panic!("expected products list");
    };
    assert_eq!(args.category.as_deref(), Some("Tools"));
    assert_eq!(args.min_price.as_deref(), Some("10"));
    assert_eq!(args.max_price.as_deref(), Some("20"));
    assert_eq!(args.min_rating.as_deref(), Some("4"));
    assert_eq!(args.location.as_deref(), Some("Berlin"));
    assert_eq!(args.limit.as_deref(), Some("5"));
    assert_eq!(args.offset.as_deref(), Some("10"));
}

#[test]
fn parses_products_search_get_and_count() {
    let cli = Cli::try_parse_from(["storelens", "products", "search", "widget"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Products {
            command: ProductCommands::Search { ref query, .. }
        }) if query == "widget"
    ));

    let cli = Cli::try_parse_from(["storelens", "products", "get", "A1"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Products {
            command: ProductCommands::Get { ref id }
        }) if id == "A1"
    ));

    let cli = Cli::try_parse_from(["storelens", "products", "count"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Products {
            command: ProductCommands::Count
        })
    ));
}

#[test]
fn by_field_takes_exactly_one_key() {
    assert!(Cli::try_parse_from(["storelens", "products", "by-field"]).is_err());
    assert!(Cli::try_parse_from([
        "storelens",
        "products",
        "by-field",
        "--title",
        "Widget",
        "--category",
        "Tools",
    ])
    .is_err());

    let cli = Cli::try_parse_from(["storelens", "products", "by-field", "--event", "Prime Day"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Products {
            command: ProductCommands::ByField(FieldArgs { event: Some(ref e), .. })
        }) if e == "Prime Day"
    ));
}

#[test]
fn parses_products_update() {
    let cli = Cli::try_parse_from(["storelens", "products", "update", "A1", r#"{"price":"120"}"#])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Products {
            command: ProductCommands::Update { ref id, .. }
        }) if id == "A1"
    ));
}

#[test]
fn parses_analytics_list() {
    let cli = Cli::try_parse_from(["storelens", "analytics", "list", "--product", "A1"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Analytics {
            command: AnalyticsCommands::List { product: Some(ref p) }
        }) if p == "A1"
    ));
}

#[test]
fn parses_every_metric_view() {
    for (arg, view) in [
        ("dashboard", MetricView::Dashboard),
        ("trending", MetricView::Trending),
        ("top-margin", MetricView::TopMargin),
        ("underperforming", MetricView::Underperforming),
        ("categories", MetricView::Categories),
        ("sales-trend", MetricView::SalesTrend),
    ] {
        let cli = Cli::try_parse_from(["storelens", "metrics", arg])
            .unwrap_or_else(|e| panic!("failed to parse metrics {arg}: {e}"));
        let Some(Commands::Metrics(args)) = cli.command else {
            panic!("expected metrics command for {arg}");
        };
        assert_eq!(args.view, view);
        assert_eq!(args.options.limit, 10);
    }
}

#[test]
fn unknown_metric_view_is_rejected() {
    assert!(Cli::try_parse_from(["storelens", "metrics", "growth"]).is_err());
}
