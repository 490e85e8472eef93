//! SQLite-backed implementation of the repository contracts. §6, §9.
//!
//! Grounded on the teacher's `Sqlite` (`gateway/src/dal.rs`): WAL journal
//! mode for concurrent readers alongside the orchestrator's writer, and
//! `sqlx::migrate!` against an embedded migrations directory.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nebula_core::{
    BuilderKind, Container, ContainerId, ContainerStatus, Deployment, DeploymentId,
    DeploymentSnapshot, DeploymentStatus, Domain, DomainId, Project, ProjectId, Route, Service,
    ServiceId, ServiceKind, ServiceStatus, Slot,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::{DalError, Result};
use crate::traits::{
    ContainerRepository, DeploymentRepository, DomainRepository, ProjectRepository,
    RouteRepository, ServiceRepository,
};

#[derive(Clone)]
pub struct SqliteDal {
    pool: SqlitePool,
}

impl SqliteDal {
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(DalError::Sqlx)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DalError::Sqlx(sqlx::Error::Decode(Box::new(e))))
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(&s)).transpose()
}

fn env_to_json(env: &HashMap<String, String>) -> String {
    serde_json::to_string(env).unwrap_or_else(|_| "{}".to_string())
}

fn env_from_json(s: &str) -> HashMap<String, String> {
    serde_json::from_str(s).unwrap_or_default()
}

#[async_trait]
impl ProjectRepository for SqliteDal {
    async fn create(&self, project: &Project) -> Result<()> {
        sqlx::query(
            "INSERT INTO projects (id, name, display_name, description, default_repo_url, default_branch, env)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(&project.display_name)
        .bind(&project.description)
        .bind(&project.default_repo_url)
        .bind(&project.default_branch)
        .bind(env_to_json(&project.env))
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &project.name))?;
        Ok(())
    }

    async fn get(&self, id: ProjectId) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(project_from_row).transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(project_from_row).transpose()
    }

    async fn update(&self, project: &Project) -> Result<()> {
        sqlx::query(
            "UPDATE projects SET display_name = ?, description = ?, default_repo_url = ?, default_branch = ?, env = ?
             WHERE id = ?",
        )
        .bind(&project.display_name)
        .bind(&project.description)
        .bind(&project.default_repo_url)
        .bind(&project.default_branch)
        .bind(env_to_json(&project.env))
        .bind(project.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: ProjectId) -> Result<()> {
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query("SELECT * FROM projects").fetch_all(&self.pool).await?;
        rows.into_iter().map(project_from_row).collect()
    }
}

fn project_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Project> {
    Ok(Project {
        id: ProjectId::from_str(row.try_get::<String, _>("id")?.as_str())
            .map_err(|e| DalError::Sqlx(sqlx::Error::Decode(Box::new(e))))?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        description: row.try_get("description")?,
        default_repo_url: row.try_get("default_repo_url")?,
        default_branch: row.try_get("default_branch")?,
        env: env_from_json(&row.try_get::<String, _>("env")?),
    })
}

fn map_unique_violation(err: sqlx::Error, key: &str) -> DalError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("2067") || db_err.message().contains("UNIQUE") {
            return DalError::AlreadyExists(key.to_string());
        }
    }
    DalError::Sqlx(err)
}

#[async_trait]
impl ServiceRepository for SqliteDal {
    async fn create(&self, service: &Service) -> Result<()> {
        sqlx::query(
            "INSERT INTO services (id, project_id, name, kind, builder, repo_url, repo_branch, repo_subdirectory,
                image, database_kind, database_version, port, start_command, env, replicas, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(service.id.to_string())
        .bind(service.project_id.to_string())
        .bind(&service.name)
        .bind(service.kind.to_string())
        .bind(service.builder.map(|b| b.to_string()))
        .bind(&service.repo_url)
        .bind(&service.repo_branch)
        .bind(&service.repo_subdirectory)
        .bind(&service.image)
        .bind(&service.database_kind)
        .bind(&service.database_version)
        .bind(service.port.map(|p| p as i64))
        .bind(&service.start_command)
        .bind(env_to_json(&service.env))
        .bind(service.replicas as i64)
        .bind(service.status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &service.name))?;
        Ok(())
    }

    async fn get(&self, id: ServiceId) -> Result<Option<Service>> {
        let row = sqlx::query("SELECT * FROM services WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(service_from_row).transpose()
    }

    async fn get_by_project_id_and_name(
        &self,
        project_id: ProjectId,
        name: &str,
    ) -> Result<Option<Service>> {
        let row = sqlx::query("SELECT * FROM services WHERE project_id = ? AND name = ?")
            .bind(project_id.to_string())
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(service_from_row).transpose()
    }

    async fn update(&self, service: &Service) -> Result<()> {
        sqlx::query(
            "UPDATE services SET kind = ?, builder = ?, repo_url = ?, repo_branch = ?, repo_subdirectory = ?,
                image = ?, database_kind = ?, database_version = ?, port = ?, start_command = ?, env = ?,
                replicas = ?, status = ?
             WHERE id = ?",
        )
        .bind(service.kind.to_string())
        .bind(service.builder.map(|b| b.to_string()))
        .bind(&service.repo_url)
        .bind(&service.repo_branch)
        .bind(&service.repo_subdirectory)
        .bind(&service.image)
        .bind(&service.database_kind)
        .bind(&service.database_version)
        .bind(service.port.map(|p| p as i64))
        .bind(&service.start_command)
        .bind(env_to_json(&service.env))
        .bind(service.replicas as i64)
        .bind(service.status.to_string())
        .bind(service.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: ServiceId) -> Result<()> {
        sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_project_id(&self, project_id: ProjectId) -> Result<Vec<Service>> {
        let rows = sqlx::query("SELECT * FROM services WHERE project_id = ?")
            .bind(project_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(service_from_row).collect()
    }
}

fn service_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Service> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let builder: Option<String> = row.try_get("builder")?;
    let port: Option<i64> = row.try_get("port")?;

    Ok(Service {
        id: parse_id(row.try_get("id")?)?,
        project_id: parse_id(row.try_get("project_id")?)?,
        name: row.try_get("name")?,
        kind: parse_service_kind(&kind)?,
        builder: builder.map(|b| parse_builder_kind(&b)).transpose()?,
        repo_url: row.try_get("repo_url")?,
        repo_branch: row.try_get("repo_branch")?,
        repo_subdirectory: row.try_get("repo_subdirectory")?,
        image: row.try_get("image")?,
        database_kind: row.try_get("database_kind")?,
        database_version: row.try_get("database_version")?,
        port: port.map(|p| p as u16),
        start_command: row.try_get("start_command")?,
        env: env_from_json(&row.try_get::<String, _>("env")?),
        replicas: row.try_get::<i64, _>("replicas")? as u32,
        status: parse_service_status(&status)?,
    })
}

fn parse_id<T: FromStr>(s: String) -> Result<T> {
    T::from_str(&s).map_err(|_| DalError::NotFound(s))
}

fn parse_service_kind(s: &str) -> Result<ServiceKind> {
    match s {
        "web" => Ok(ServiceKind::Web),
        "worker" => Ok(ServiceKind::Worker),
        "cron" => Ok(ServiceKind::Cron),
        "database" => Ok(ServiceKind::Database),
        other => Err(DalError::NotFound(format!("unknown service kind {other}"))),
    }
}

fn parse_builder_kind(s: &str) -> Result<BuilderKind> {
    match s {
        "dockerfile" => Ok(BuilderKind::Dockerfile),
        "source-generator" => Ok(BuilderKind::SourceGenerator),
        "pre-built-image" => Ok(BuilderKind::PreBuiltImage),
        other => Err(DalError::NotFound(format!("unknown builder kind {other}"))),
    }
}

fn parse_service_status(s: &str) -> Result<ServiceStatus> {
    match s {
        "stopped" => Ok(ServiceStatus::Stopped),
        "building" => Ok(ServiceStatus::Building),
        "running" => Ok(ServiceStatus::Running),
        "failed" => Ok(ServiceStatus::Failed),
        other => Err(DalError::NotFound(format!("unknown service status {other}"))),
    }
}

fn parse_deployment_status(s: &str) -> Result<DeploymentStatus> {
    match s {
        "pending" => Ok(DeploymentStatus::Pending),
        "preparing" => Ok(DeploymentStatus::Preparing),
        "deploying" => Ok(DeploymentStatus::Deploying),
        "running" => Ok(DeploymentStatus::Running),
        "failed" => Ok(DeploymentStatus::Failed),
        "stopped" => Ok(DeploymentStatus::Stopped),
        other => Err(DalError::NotFound(format!("unknown deployment status {other}"))),
    }
}

fn parse_slot(s: &str) -> Result<Slot> {
    match s {
        "blue" => Ok(Slot::Blue),
        "green" => Ok(Slot::Green),
        other => Err(DalError::NotFound(format!("unknown slot {other}"))),
    }
}

#[async_trait]
impl DeploymentRepository for SqliteDal {
    async fn create(&self, deployment: &Deployment) -> Result<()> {
        sqlx::query(
            "INSERT INTO deployments (id, project_id, service_id, version, slot, status, snapshot,
                error_message, created_at, started_at, finished_at, logs)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(deployment.id.to_string())
        .bind(deployment.project_id.to_string())
        .bind(deployment.service_id.to_string())
        .bind(&deployment.version)
        .bind(deployment.slot.to_string())
        .bind(deployment.status.to_string())
        .bind(serde_json::to_string(&deployment.snapshot).unwrap_or_else(|_| "{}".into()))
        .bind(&deployment.error_message)
        .bind(to_rfc3339(deployment.created_at))
        .bind(deployment.started_at.map(to_rfc3339))
        .bind(deployment.finished_at.map(to_rfc3339))
        .bind(&deployment.logs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: DeploymentId) -> Result<Option<Deployment>> {
        let row = sqlx::query("SELECT * FROM deployments WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(deployment_from_row).transpose()
    }

    async fn update(&self, deployment: &Deployment) -> Result<()> {
        sqlx::query(
            "UPDATE deployments SET status = ?, error_message = ?, started_at = ?, finished_at = ?, logs = ?
             WHERE id = ?",
        )
        .bind(deployment.status.to_string())
        .bind(&deployment.error_message)
        .bind(deployment.started_at.map(to_rfc3339))
        .bind(deployment.finished_at.map(to_rfc3339))
        .bind(&deployment.logs)
        .bind(deployment.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: DeploymentId) -> Result<()> {
        sqlx::query("DELETE FROM deployments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_service_id(&self, service_id: ServiceId) -> Result<Vec<Deployment>> {
        let rows = sqlx::query("SELECT * FROM deployments WHERE service_id = ? ORDER BY created_at DESC")
            .bind(service_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(deployment_from_row).collect()
    }

    async fn get_by_service_id_and_slot(
        &self,
        service_id: ServiceId,
        slot: Slot,
    ) -> Result<Option<Deployment>> {
        let row = sqlx::query(
            "SELECT * FROM deployments WHERE service_id = ? AND slot = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(service_id.to_string())
        .bind(slot.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(deployment_from_row).transpose()
    }
}

fn deployment_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Deployment> {
    let slot: String = row.try_get("slot")?;
    let status: String = row.try_get("status")?;
    let snapshot: String = row.try_get("snapshot")?;

    Ok(Deployment {
        id: parse_id(row.try_get("id")?)?,
        project_id: parse_id(row.try_get("project_id")?)?,
        service_id: parse_id(row.try_get("service_id")?)?,
        version: row.try_get("version")?,
        slot: parse_slot(&slot)?,
        status: parse_deployment_status(&status)?,
        snapshot: serde_json::from_str::<DeploymentSnapshot>(&snapshot).unwrap_or_default(),
        error_message: row.try_get("error_message")?,
        created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
        started_at: parse_opt_ts(row.try_get("started_at")?)?,
        finished_at: parse_opt_ts(row.try_get("finished_at")?)?,
        logs: row.try_get("logs")?,
    })
}

#[async_trait]
impl ContainerRepository for SqliteDal {
    async fn create(&self, container: &Container) -> Result<()> {
        sqlx::query(
            "INSERT INTO containers (id, deployment_id, runtime_id, name, status, host_port)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(container.id.to_string())
        .bind(container.deployment_id.to_string())
        .bind(&container.runtime_id)
        .bind(&container.name)
        .bind(container.status.to_string())
        .bind(container.host_port.map(|p| p as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: ContainerId) -> Result<Option<Container>> {
        let row = sqlx::query("SELECT * FROM containers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(container_from_row).transpose()
    }

    async fn update(&self, container: &Container) -> Result<()> {
        sqlx::query("UPDATE containers SET status = ?, host_port = ? WHERE id = ?")
            .bind(container.status.to_string())
            .bind(container.host_port.map(|p| p as i64))
            .bind(container.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: ContainerId) -> Result<()> {
        sqlx::query("DELETE FROM containers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_deployment_id(&self, deployment_id: DeploymentId) -> Result<Vec<Container>> {
        let rows = sqlx::query("SELECT * FROM containers WHERE deployment_id = ?")
            .bind(deployment_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(container_from_row).collect()
    }
}

fn container_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Container> {
    let status: String = row.try_get("status")?;
    let host_port: Option<i64> = row.try_get("host_port")?;

    Ok(Container {
        id: parse_id(row.try_get("id")?)?,
        deployment_id: parse_id(row.try_get("deployment_id")?)?,
        runtime_id: row.try_get("runtime_id")?,
        name: row.try_get("name")?,
        status: match status.as_str() {
            "created" => ContainerStatus::Created,
            "running" => ContainerStatus::Running,
            "stopped" => ContainerStatus::Stopped,
            "dead" => ContainerStatus::Dead,
            other => return Err(DalError::NotFound(format!("unknown container status {other}"))),
        },
        host_port: host_port.map(|p| p as u16),
    })
}

#[async_trait]
impl DomainRepository for SqliteDal {
    async fn create(&self, domain: &Domain) -> Result<()> {
        sqlx::query(
            "INSERT INTO domains (id, project_id, service_id, domain, path_prefix, active_slot, ssl)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(domain.id.to_string())
        .bind(domain.project_id.to_string())
        .bind(domain.service_id.to_string())
        .bind(&domain.domain)
        .bind(&domain.path_prefix)
        .bind(domain.active_slot.to_string())
        .bind(domain.ssl)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &domain.domain))?;
        Ok(())
    }

    async fn get(&self, id: DomainId) -> Result<Option<Domain>> {
        let row = sqlx::query("SELECT * FROM domains WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(domain_from_row).transpose()
    }

    async fn get_by_domain(&self, domain: &str) -> Result<Option<Domain>> {
        let row = sqlx::query("SELECT * FROM domains WHERE domain = ?")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;
        row.map(domain_from_row).transpose()
    }

    async fn update(&self, domain: &Domain) -> Result<()> {
        sqlx::query("UPDATE domains SET path_prefix = ?, active_slot = ?, ssl = ? WHERE id = ?")
            .bind(&domain.path_prefix)
            .bind(domain.active_slot.to_string())
            .bind(domain.ssl)
            .bind(domain.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: DomainId) -> Result<()> {
        sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_project_id(&self, project_id: ProjectId) -> Result<Vec<Domain>> {
        let rows = sqlx::query("SELECT * FROM domains WHERE project_id = ?")
            .bind(project_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(domain_from_row).collect()
    }
}

fn domain_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Domain> {
    let slot: String = row.try_get("active_slot")?;
    Ok(Domain {
        id: parse_id(row.try_get("id")?)?,
        project_id: parse_id(row.try_get("project_id")?)?,
        service_id: parse_id(row.try_get("service_id")?)?,
        domain: row.try_get("domain")?,
        path_prefix: row.try_get("path_prefix")?,
        active_slot: parse_slot(&slot)?,
        ssl: row.try_get("ssl")?,
    })
}

#[async_trait]
impl RouteRepository for SqliteDal {
    async fn upsert(&self, route: &Route) -> Result<()> {
        sqlx::query(
            "INSERT INTO routes (project_id, active_slot) VALUES (?, ?)
             ON CONFLICT(project_id) DO UPDATE SET active_slot = excluded.active_slot",
        )
        .bind(route.project_id.to_string())
        .bind(route.active_slot.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, project_id: ProjectId) -> Result<Option<Route>> {
        let row = sqlx::query("SELECT * FROM routes WHERE project_id = ?")
            .bind(project_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            let slot: String = row.try_get("active_slot")?;
            Ok(Route {
                project_id: parse_id(row.try_get("project_id")?)?,
                active_slot: parse_slot(&slot)?,
            })
        })
        .transpose()
    }

    async fn delete(&self, project_id: ProjectId) -> Result<()> {
        sqlx::query("DELETE FROM routes WHERE project_id = ?")
            .bind(project_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_core::ServiceKind;

    async fn dal() -> SqliteDal {
        SqliteDal::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_and_get_project_round_trips() {
        let dal = dal().await;
        let project = Project::new("acme", "Acme Corp");
        ProjectRepository::create(&dal, &project).await.unwrap();

        let fetched = ProjectRepository::get(&dal, project.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "acme");
        assert_eq!(fetched.display_name, "Acme Corp");
    }

    #[tokio::test]
    async fn get_by_name_returns_none_when_absent() {
        let dal = dal().await;
        assert!(dal.get_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_project_name_is_conflict() {
        let dal = dal().await;
        let a = Project::new("acme", "Acme");
        let b = Project::new("acme", "Acme Again");
        ProjectRepository::create(&dal, &a).await.unwrap();
        let err = ProjectRepository::create(&dal, &b).await.unwrap_err();
        assert!(matches!(err, DalError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn service_round_trip_preserves_env_map() {
        let dal = dal().await;
        let project = Project::new("acme", "Acme");
        ProjectRepository::create(&dal, &project).await.unwrap();

        let mut service = Service::new(project.id, "web", ServiceKind::Web);
        service.env.insert("PORT".into(), "3000".into());
        ServiceRepository::create(&dal, &service).await.unwrap();

        let fetched = ServiceRepository::get(&dal, service.id).await.unwrap().unwrap();
        assert_eq!(fetched.env.get("PORT"), Some(&"3000".to_string()));
    }

    #[tokio::test]
    async fn deployment_ordering_by_created_at_descending() {
        use chrono::TimeZone;
        use nebula_core::{DeploymentSnapshot, Slot};

        let dal = dal().await;
        let project = Project::new("acme", "Acme");
        ProjectRepository::create(&dal, &project).await.unwrap();
        let service = Service::new(project.id, "web", ServiceKind::Web);
        ServiceRepository::create(&dal, &service).await.unwrap();

        let older = Deployment::new(
            project.id,
            service.id,
            Slot::Blue,
            DeploymentSnapshot::default(),
            Utc.timestamp_opt(1000, 0).unwrap(),
        );
        let newer = Deployment::new(
            project.id,
            service.id,
            Slot::Blue,
            DeploymentSnapshot::default(),
            Utc.timestamp_opt(2000, 0).unwrap(),
        );
        DeploymentRepository::create(&dal, &older).await.unwrap();
        DeploymentRepository::create(&dal, &newer).await.unwrap();

        let list = dal.list_by_service_id(service.id).await.unwrap();
        assert_eq!(list[0].id, newer.id);
        assert_eq!(list[1].id, older.id);
    }
}
