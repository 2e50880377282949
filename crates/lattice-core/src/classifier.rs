//! Path-based file role classification

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Category;

/// Ordered rules; the first category with a matching pattern wins.
static RULES: LazyLock<Vec<(Category, Vec<Regex>)>> = LazyLock::new(|| {
    let rule = |category: Category, patterns: &[&str]| {
        let compiled = patterns
            .iter()
            .map(|p| Regex::new(p).expect("classifier pattern"))
            .collect();
        (category, compiled)
    };
    vec![
        rule(
            Category::Model,
            &[
                r"(^|/)(models?|entities|entity|domain)/",
                r"(^|[/._-])(models?|entity|entities)\.[a-z]+$",
                r"[a-z](model|entity)\.(kt|kts)$",
            ],
        ),
        rule(
            Category::Dto,
            &[
                r"(^|/)(dtos?|schemas?|serializers?)/",
                r"(^|[/._-])(dtos?|schemas?|serializers?|requests?|responses?)\.[a-z]+$",
                r"[a-z](dto|request|response)\.(kt|kts)$",
            ],
        ),
        rule(
            Category::Route,
            &[
                r"(^|/)(routes?|routers?|controllers?|api|endpoints?|views?|handlers?|pages|screens?)/",
                r"(^|[/._-])(routes?|routers?|controllers?|endpoints?|views?|handlers?|screens?)\.[a-z]+$",
                r"[a-z](controller|screen|route)\.(kt|kts)$",
            ],
        ),
        rule(
            Category::Service,
            &[
                r"(^|/)(services?|usecases?|use_cases|providers?|repositories)/",
                r"(^|[/._-])(services?|usecases?|providers?|repository|repo)\.[a-z]+$",
                r"[a-z](service|usecase|repository|viewmodel)\.(kt|kts)$",
            ],
        ),
        rule(
            Category::Middleware,
            &[
                r"(^|/)(middlewares?|guards?|interceptors?)/",
                r"(^|[/._-])(middlewares?|guards?|interceptors?)\.[a-z]+$",
            ],
        ),
        rule(
            Category::Config,
            &[
                r"(^|/)(config|configs|settings|conf)/",
                r"(^|[/._-])(config|configuration|settings|env)\.[a-z]+$",
                r"(^|/)[a-z]+\.config\.[a-z]+$",
            ],
        ),
        rule(
            Category::Test,
            &[
                r"(^|/)(tests?|__tests__|specs?|androidtest)/",
                r"(^|/)(test_[^/]+|conftest\.py)$",
                r"_test\.[a-z]+$",
                r"\.(test|spec)\.[a-z]+$",
                r"[a-z]tests?\.(kt|kts)$",
            ],
        ),
        rule(
            Category::Migration,
            &[
                r"(^|/)(migrations?|alembic)/",
                r"(^|[/._-])migrations?\.[a-z]+$",
            ],
        ),
        rule(
            Category::Util,
            &[
                r"(^|/)(utils?|helpers?|lib|common|shared)/",
                r"(^|[/._-])(utils?|helpers?|extensions?)\.[a-z]+$",
            ],
        ),
    ]
});

/// Classify a workspace-relative path into a role category.
///
/// Pure and deterministic: matching runs on the lower-cased path with
/// `/` separators, so `Models\User.kt` and `models/user.kt` agree.
pub fn classify(relative_path: &str) -> Category {
    let normalized = relative_path.replace('\\', "/").to_lowercase();
    let normalized = normalized.trim_start_matches("./");

    RULES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(normalized)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Unknown)
}
