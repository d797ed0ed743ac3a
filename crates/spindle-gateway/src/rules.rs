//! パスセキュリティルール
//!
//! リクエストパスは名前付きルールの列を順番に通ります。最初の拒否で打ち切り、
//! 全ルールを通過したものだけがファイルとして配信されます。
//!
//! 既定の順序:
//! 1. `reserved-prefix` - 先頭セグメントが asset root 自身の名前なら 404
//! 2. `root-rewrite`     - `/` を index document に書き換え
//! 3. `traversal-guard`  - `..` 等を拒否し、canonical パスが root の内側か確認（外なら 404）
//! 4. `directory-block`  - 解決先がディレクトリなら 403

use std::path::{Component, PathBuf};

use async_trait::async_trait;
use percent_encoding::percent_decode_str;

use crate::assets::AssetRoot;

/// 拒否の種類。レスポンス本文にはパスを含めない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotFound,
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Deny(Denial),
}

/// ルール間で受け渡すリクエストの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// percent-decode 済みのパス（`/` 始まり）
    pub path: String,
    /// traversal-guard が埋める canonical パス
    pub resolved: Option<PathBuf>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resolved: None,
        }
    }

    fn first_segment(&self) -> Option<&str> {
        self.path.split('/').find(|segment| !segment.is_empty())
    }
}

#[async_trait]
pub trait PathRule: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, ctx: &mut RequestContext) -> Verdict;
}

/// 評価結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Serve(PathBuf),
    Deny { rule: &'static str, denial: Denial },
}

pub struct ReservedPrefix {
    segment: Option<String>,
}

impl ReservedPrefix {
    pub fn new(segment: Option<String>) -> Self {
        Self {
            segment: segment.filter(|s| !s.is_empty()),
        }
    }
}

#[async_trait]
impl PathRule for ReservedPrefix {
    fn name(&self) -> &'static str {
        "reserved-prefix"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> Verdict {
        match (&self.segment, ctx.first_segment()) {
            (Some(reserved), Some(first)) if first == reserved => Verdict::Deny(Denial::NotFound),
            _ => Verdict::Continue,
        }
    }
}

pub struct RootRewrite {
    index_document: String,
}

impl RootRewrite {
    pub fn new(index_document: impl Into<String>) -> Self {
        Self {
            index_document: index_document.into(),
        }
    }
}

#[async_trait]
impl PathRule for RootRewrite {
    fn name(&self) -> &'static str {
        "root-rewrite"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> Verdict {
        if ctx.path.is_empty() || ctx.path == "/" {
            ctx.path = format!("/{}", self.index_document);
        }
        Verdict::Continue
    }
}

pub struct TraversalGuard {
    root: AssetRoot,
}

impl TraversalGuard {
    pub fn new(root: AssetRoot) -> Self {
        Self { root }
    }
}

/// 危険なセグメントを含まない相対パスを組み立てる
fn relative_path(path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." || segment.contains(['\\', '\0']) {
            return None;
        }
        relative.push(segment);
    }
    // Windows の drive prefix など
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(relative)
}

#[async_trait]
impl PathRule for TraversalGuard {
    fn name(&self) -> &'static str {
        "traversal-guard"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> Verdict {
        let Some(relative) = relative_path(&ctx.path) else {
            return Verdict::Deny(Denial::NotFound);
        };

        // symlink もここで解決される
        let candidate = self.root.path().join(relative);
        let Ok(canonical) = tokio::fs::canonicalize(&candidate).await else {
            return Verdict::Deny(Denial::NotFound);
        };
        if !self.root.contains(&canonical) {
            return Verdict::Deny(Denial::NotFound);
        }

        ctx.resolved = Some(canonical);
        Verdict::Continue
    }
}

pub struct DirectoryBlock;

#[async_trait]
impl PathRule for DirectoryBlock {
    fn name(&self) -> &'static str {
        "directory-block"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> Verdict {
        let Some(resolved) = ctx.resolved.as_deref() else {
            return Verdict::Deny(Denial::NotFound);
        };
        match tokio::fs::metadata(resolved).await {
            Ok(meta) if meta.is_dir() => Verdict::Deny(Denial::Forbidden),
            Ok(meta) if meta.is_file() => Verdict::Continue,
            _ => Verdict::Deny(Denial::NotFound),
        }
    }
}

pub struct RuleChain {
    rules: Vec<Box<dyn PathRule>>,
}

impl RuleChain {
    pub fn new(rules: Vec<Box<dyn PathRule>>) -> Self {
        Self { rules }
    }

    /// 既定のルール列
    pub fn standard(
        root: AssetRoot,
        reserved_segment: Option<String>,
        index_document: impl Into<String>,
    ) -> Self {
        let reserved = reserved_segment.or_else(|| root.dir_name());
        Self::new(vec![
            Box::new(ReservedPrefix::new(reserved)),
            Box::new(RootRewrite::new(index_document)),
            Box::new(TraversalGuard::new(root)),
            Box::new(DirectoryBlock),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// 生のリクエストパス（percent-encode されたまま）を評価する
    pub async fn evaluate(&self, raw_path: &str) -> Resolution {
        let Ok(decoded) = percent_decode_str(raw_path).decode_utf8() else {
            return Resolution::Deny {
                rule: "path-decode",
                denial: Denial::NotFound,
            };
        };

        let mut ctx = RequestContext::new(decoded.into_owned());
        for rule in &self.rules {
            if let Verdict::Deny(denial) = rule.apply(&mut ctx).await {
                return Resolution::Deny {
                    rule: rule.name(),
                    denial,
                };
            }
        }

        match ctx.resolved {
            Some(path) => Resolution::Serve(path),
            // 解決するルールがないチェーンは何も配信しない
            None => Resolution::Deny {
                rule: "unresolved",
                denial: Denial::NotFound,
            },
        }
    }
}

impl std::fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: AssetRoot,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("dashboard");
        std::fs::create_dir_all(root.join("css")).unwrap();
        std::fs::create_dir_all(root.join("dashboard")).unwrap();
        std::fs::write(root.join("index.html"), "<h1>index</h1>").unwrap();
        std::fs::write(root.join("css/style.css"), "body {}").unwrap();
        std::fs::write(root.join("dashboard/inner.txt"), "inner").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();
        let root = AssetRoot::open(&root).unwrap();
        Fixture { _dir: dir, root }
    }

    fn chain(fx: &Fixture) -> RuleChain {
        RuleChain::standard(fx.root.clone(), None, "index.html")
    }

    #[test]
    fn standard_chain_order() {
        let fx = fixture();
        assert_eq!(
            chain(&fx).names(),
            vec![
                "reserved-prefix",
                "root-rewrite",
                "traversal-guard",
                "directory-block"
            ]
        );
    }

    #[rstest]
    #[case("a/b/c", Some("a/b/c"))]
    #[case("/a//b/", Some("a/b"))]
    #[case("/../etc/passwd", None)]
    #[case("/css/./style.css", None)]
    #[case("/css\\..\\secret", None)]
    #[case("/nul\0byte", None)]
    fn relative_path_rejects_dangerous_segments(
        #[case] input: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(relative_path(input), expected.map(PathBuf::from));
    }

    #[tokio::test]
    async fn root_and_index_resolve_to_the_same_file() {
        let fx = fixture();
        let chain = chain(&fx);
        let expected = Resolution::Serve(fx.root.path().join("index.html"));
        assert_eq!(chain.evaluate("/").await, expected);
        assert_eq!(chain.evaluate("/index.html").await, expected);
    }

    #[tokio::test]
    async fn reserved_segment_is_rejected_before_resolution() {
        let fx = fixture();
        let chain = chain(&fx);
        for path in ["/dashboard/inner.txt", "/dashboard", "/%64ashboard/inner.txt"] {
            assert_eq!(
                chain.evaluate(path).await,
                Resolution::Deny {
                    rule: "reserved-prefix",
                    denial: Denial::NotFound
                },
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn reserved_segment_only_matches_first_segment() {
        let fx = fixture();
        std::fs::create_dir_all(fx.root.path().join("css/dashboard")).unwrap();
        std::fs::write(fx.root.path().join("css/dashboard/x.css"), "x").unwrap();
        let chain = chain(&fx);
        assert!(matches!(
            chain.evaluate("/css/dashboard/x.css").await,
            Resolution::Serve(_)
        ));
    }

    #[tokio::test]
    async fn explicit_reserved_segment_overrides_dir_name() {
        let fx = fixture();
        let chain = RuleChain::standard(fx.root.clone(), Some("css".into()), "index.html");
        assert!(matches!(
            chain.evaluate("/css/style.css").await,
            Resolution::Deny { rule: "reserved-prefix", .. }
        ));
        assert!(matches!(
            chain.evaluate("/dashboard/inner.txt").await,
            Resolution::Serve(_)
        ));
    }

    #[rstest]
    #[case("/../secret.txt")]
    #[case("/%2e%2e/secret.txt")]
    #[case("/css/../../secret.txt")]
    #[case("/..%2fsecret.txt")]
    #[case("/css/%2E%2E/%2E%2E/secret.txt")]
    #[tokio::test]
    async fn traversal_attempts_are_not_found(#[case] path: &str) {
        let fx = fixture();
        assert_eq!(
            chain(&fx).evaluate(path).await,
            Resolution::Deny {
                rule: "traversal-guard",
                denial: Denial::NotFound
            }
        );
    }

    #[tokio::test]
    async fn invalid_percent_encoding_is_not_found() {
        let fx = fixture();
        assert_eq!(
            chain(&fx).evaluate("/%ff%fe.html").await,
            Resolution::Deny {
                rule: "path-decode",
                denial: Denial::NotFound
            }
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let fx = fixture();
        assert_eq!(
            chain(&fx).evaluate("/nope.js").await,
            Resolution::Deny {
                rule: "traversal-guard",
                denial: Denial::NotFound
            }
        );
    }

    #[rstest]
    #[case("/css")]
    #[case("/css/")]
    #[tokio::test]
    async fn directories_are_forbidden(#[case] path: &str) {
        let fx = fixture();
        assert_eq!(
            chain(&fx).evaluate(path).await,
            Resolution::Deny {
                rule: "directory-block",
                denial: Denial::Forbidden
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_root_is_not_found() {
        let fx = fixture();
        let outside = fx.root.path().parent().unwrap().join("secret.txt");
        std::os::unix::fs::symlink(&outside, fx.root.path().join("leak.txt")).unwrap();
        assert_eq!(
            chain(&fx).evaluate("/leak.txt").await,
            Resolution::Deny {
                rule: "traversal-guard",
                denial: Denial::NotFound
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_inside_root_is_served() {
        let fx = fixture();
        let target = fx.root.path().join("css/style.css");
        std::os::unix::fs::symlink(&target, fx.root.path().join("alias.css")).unwrap();
        assert_eq!(
            chain(&fx).evaluate("/alias.css").await,
            Resolution::Serve(target)
        );
    }

    #[tokio::test]
    async fn chain_without_resolver_serves_nothing() {
        let chain = RuleChain::new(vec![Box::new(RootRewrite::new("index.html"))]);
        assert!(matches!(
            chain.evaluate("/").await,
            Resolution::Deny { rule: "unresolved", .. }
        ));
    }
}
