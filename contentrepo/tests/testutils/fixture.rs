//! Memory repository fixture

use super::spy_factory::{SpySessionFactory, SwitchableCredentialsProvider};
use contentrepo::repository::{Node, PropertyValue, Repository, Session};
use contentrepo::{
    Credentials, LoginSessionFactory, MemoryRepository, MemorySession, PoolConfig,
    PooledSessionFactory, RepositoryTemplate, SessionFactory, SessionPool, SimpleSessionFactory,
};
use std::sync::Arc;

pub type MemoryPool = SessionPool<LoginSessionFactory<Arc<MemoryRepository>>>;

/// Number of articles `seed_articles` creates under `/content`
pub const ARTICLE_COUNT: usize = 5;

pub const ARTICLE_TYPE: &str = "demo:article";

/// Repository with workspaces `default` and `archive` and the accounts
/// `system`, `alice` and `bob`, reached through a spied template
pub struct TestFixture {
    pub repository: MemoryRepository,
    pub credentials: Arc<SwitchableCredentialsProvider>,
    pub spy: Arc<SpySessionFactory>,
    pub pool: Option<Arc<MemoryPool>>,
    pub template: RepositoryTemplate<MemorySession>,
}

impl TestFixture {
    /// Template over a keyed pool
    pub fn pooled(config: PoolConfig) -> Self {
        Self::pooled_with_password(config, "system")
    }

    /// Pooled fixture whose global identity uses `password`
    pub fn pooled_with_password(config: PoolConfig, password: &str) -> Self {
        super::init_logging();
        let repository = Self::repository();
        let credentials = Arc::new(SwitchableCredentialsProvider::new(Credentials::new(
            "system", password,
        )));
        let login = LoginSessionFactory::new(Arc::new(repository.clone()), credentials.clone());
        let pool = SessionPool::new(login, config).expect("valid pool configuration");
        let factory = Arc::new(PooledSessionFactory::new(pool.clone()));
        Self::build(repository, credentials, factory, Some(pool))
    }

    /// Template that logs in and out on every call
    pub fn simple() -> Self {
        super::init_logging();
        let repository = Self::repository();
        let credentials = Arc::new(SwitchableCredentialsProvider::new(Credentials::new(
            "system", "system",
        )));
        let factory = Arc::new(SimpleSessionFactory::new(
            Arc::new(repository.clone()),
            credentials.clone(),
        ));
        Self::build(repository, credentials, factory, None)
    }

    fn repository() -> MemoryRepository {
        MemoryRepository::new()
            .with_workspace("default")
            .with_workspace("archive")
            .with_account("system", "system")
            .with_account("alice", "alice")
            .with_account("bob", "bob")
    }

    fn build(
        repository: MemoryRepository,
        credentials: Arc<SwitchableCredentialsProvider>,
        factory: Arc<dyn SessionFactory<Session = MemorySession>>,
        pool: Option<Arc<MemoryPool>>,
    ) -> Self {
        let spy = Arc::new(SpySessionFactory::new(factory));
        let template =
            RepositoryTemplate::new(spy.clone()).with_credentials_provider(credentials.clone());
        Self {
            repository,
            credentials,
            spy,
            pool,
            template,
        }
    }

    /// Impersonate `user` on every following template call
    pub fn impersonate(&self, user: &str) {
        self.credentials
            .set_user(Some(Credentials::new(user, user)));
    }

    pub fn stop_impersonating(&self) {
        self.credentials.set_user(None);
    }

    /// Create `/content` with `ARTICLE_COUNT` articles and a folder, bypassing the template
    ///
    /// Articles are named `article-0`..`article-4` with a `title`, a `views`
    /// count and a `section` of `news` for even and `sport` for odd indexes.
    /// Returns the article identifiers in creation order.
    pub fn seed_articles(&self, workspace: &str) -> Vec<String> {
        let mut session = self
            .repository
            .login(&Credentials::new("system", "system"), workspace)
            .expect("seed login");
        let root = session.root_node().expect("root").expect("root present");
        let content = root.add_node("content", "nt:folder").expect("content");
        content.add_node("images", "nt:folder").expect("images");

        let mut ids = Vec::with_capacity(ARTICLE_COUNT);
        for i in 0..ARTICLE_COUNT {
            let article = content
                .add_node(&format!("article-{}", i), ARTICLE_TYPE)
                .expect("article");
            article
                .set_property("title", PropertyValue::from(format!("Article {}", i)))
                .expect("title");
            article
                .set_property("views", PropertyValue::Long(i as i64 * 10))
                .expect("views");
            let section = if i % 2 == 0 { "news" } else { "sport" };
            article
                .set_property("section", section.into())
                .expect("section");
            ids.push(article.identifier().expect("identifier"));
        }
        session.save().expect("save");
        session.logout().expect("seed logout");
        ids
    }
}
