//! MCP resource surface — fixed read-only documents
//!
//! Four `autosphere://` URIs with static content describing the system.

use rmcp::model::{
    AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents,
};
use serde_json::json;

use super::AutosphereServer;

fn resource(uri: &str, name: &str, description: &str, mime_type: &str) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description.into());
    raw.mime_type = Some(mime_type.into());
    raw.no_annotation()
}

fn text_contents(uri: &str, mime_type: &str, text: String) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ResourceContents::TextResourceContents {
            uri: uri.into(),
            mime_type: Some(mime_type.into()),
            text,
            meta: None,
        }],
    }
}

impl AutosphereServer {
    pub(super) fn resource_list() -> Vec<Resource> {
        vec![
            resource(
                "autosphere://config",
                "config",
                "Autosphere system configuration",
                "text/markdown",
            ),
            resource(
                "autosphere://deployment-manifest",
                "deployment-manifest",
                "Kubernetes deployment manifest for the Autosphere API",
                "text/yaml",
            ),
            resource(
                "autosphere://health-report",
                "health-report",
                "Latest health check report",
                "application/json",
            ),
            resource(
                "autosphere://awx-templates",
                "awx-templates",
                "Catalog of the standard AWX job templates",
                "application/json",
            ),
        ]
    }

    pub(super) fn read_resource_text(&self, uri: &str) -> Option<ReadResourceResult> {
        match uri {
            "autosphere://config" => Some(text_contents(uri, "text/markdown", self.config_doc())),
            "autosphere://deployment-manifest" => {
                Some(text_contents(uri, "text/yaml", deployment_manifest()))
            }
            "autosphere://health-report" => {
                Some(text_contents(uri, "application/json", health_report()))
            }
            "autosphere://awx-templates" => {
                Some(text_contents(uri, "application/json", awx_template_catalog()))
            }
            _ => None,
        }
    }

    fn config_doc(&self) -> String {
        let config = json!({
            "system": {
                "name": "Autosphere",
                "version": env!("CARGO_PKG_VERSION"),
                "environment": "production",
                "components": [
                    "api-server", "web-frontend", "database",
                    "cache", "workers", "monitoring",
                ],
            },
            "awx": {
                "base_url": self.awx_base_url,
                "job_templates": [
                    "autosphere-deploy",
                    "autosphere-autoscale",
                    "autosphere-health-check",
                    "autosphere-backup",
                ],
            },
            "scaling": {
                "min_replicas": 2,
                "max_replicas": 10,
                "cpu_threshold": 70,
                "memory_threshold": 80,
            },
            "health_checks": {
                "enabled": true,
                "interval": "30s",
                "timeout": "10s",
                "endpoints": ["/health", "/api/v1/status", "/metrics"],
            },
        });

        format!(
            "# Autosphere System Configuration\n\nGenerated at: {}\n\n```json\n{}\n```",
            chrono::Utc::now().to_rfc3339(),
            serde_json::to_string_pretty(&config).unwrap_or_default()
        )
    }
}

fn deployment_manifest() -> String {
    format!(
        r#"# Autosphere Deployment Manifest
# Generated at: {}

apiVersion: apps/v1
kind: Deployment
metadata:
  name: autosphere-api
  namespace: autosphere
  labels:
    app: autosphere
    component: api
spec:
  replicas: 3
  selector:
    matchLabels:
      app: autosphere
      component: api
  template:
    metadata:
      labels:
        app: autosphere
        component: api
    spec:
      containers:
      - name: autosphere-api
        image: autosphere/api:latest
        ports:
        - containerPort: 8080
        env:
        - name: DATABASE_URL
          valueFrom:
            secretKeyRef:
              name: autosphere-secrets
              key: database-url
        - name: REDIS_URL
          valueFrom:
            secretKeyRef:
              name: autosphere-secrets
              key: redis-url
        resources:
          requests:
            memory: "256Mi"
            cpu: "250m"
          limits:
            memory: "512Mi"
            cpu: "500m"
        livenessProbe:
          httpGet:
            path: /health
            port: 8080
          initialDelaySeconds: 30
          periodSeconds: 10
        readinessProbe:
          httpGet:
            path: /ready
            port: 8080
          initialDelaySeconds: 5
          periodSeconds: 5
---
apiVersion: v1
kind: Service
metadata:
  name: autosphere-api-service
  namespace: autosphere
spec:
  selector:
    app: autosphere
    component: api
  ports:
  - protocol: TCP
    port: 80
    targetPort: 8080
  type: ClusterIP
"#,
        chrono::Utc::now().to_rfc3339()
    )
}

fn health_report() -> String {
    let now = chrono::Utc::now();
    let report = json!({
        "timestamp": now.to_rfc3339(),
        "overall_status": "healthy",
        "services": {
            "api": {
                "status": "healthy",
                "response_time": "45ms",
                "cpu_usage": "23%",
                "memory_usage": "67%",
            },
            "database": {
                "status": "healthy",
                "connections": 12,
                "cpu_usage": "15%",
                "memory_usage": "45%",
            },
            "cache": {
                "status": "healthy",
                "hit_rate": "94%",
                "memory_usage": "34%",
            },
            "workers": {
                "status": "healthy",
                "active_jobs": 3,
                "queue_length": 7,
            },
        },
        "alerts": [{
            "severity": "warning",
            "component": "api",
            "message": "Memory usage approaching 70% threshold",
        }],
    });

    format!(
        "# Autosphere Health Check Report\n\n```json\n{}\n```",
        serde_json::to_string_pretty(&report).unwrap_or_default()
    )
}

fn awx_template_catalog() -> String {
    let templates = json!({
        "job_templates": [
            {
                "id": 1,
                "name": "autosphere-deploy",
                "description": "Deploy Autosphere application to Kubernetes",
                "playbook": "deploy.yml",
                "inventory": "autosphere-k8s",
                "variables": {
                    "namespace": "autosphere",
                    "image_tag": "latest",
                    "replicas": 3,
                },
            },
            {
                "id": 2,
                "name": "autosphere-autoscale",
                "description": "Autoscale Autosphere services based on metrics",
                "playbook": "autoscale.yml",
                "inventory": "autosphere-k8s",
                "variables": {
                    "min_replicas": 2,
                    "max_replicas": 10,
                    "cpu_threshold": 70,
                    "memory_threshold": 80,
                },
            },
            {
                "id": 3,
                "name": "autosphere-health-check",
                "description": "Perform comprehensive health checks",
                "playbook": "health-check.yml",
                "inventory": "autosphere-k8s",
                "variables": {
                    "check_endpoints": true,
                    "check_databases": true,
                    "check_external": true,
                },
            },
            {
                "id": 4,
                "name": "autosphere-backup",
                "description": "Backup Autosphere data and configurations",
                "playbook": "backup.yml",
                "inventory": "autosphere-k8s",
                "variables": {
                    "backup_type": "full",
                    "retention_days": 30,
                    "compress": true,
                    "include_databases": true,
                },
            },
        ],
    });

    format!(
        "# AWX Job Templates\n\nAvailable job templates for Autosphere automation:\n\n```json\n{}\n```",
        serde_json::to_string_pretty(&templates).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_list_has_four_entries() {
        let resources = AutosphereServer::resource_list();
        assert_eq!(resources.len(), 4);

        let uris: Vec<&str> = resources.iter().map(|r| r.raw.uri.as_str()).collect();
        assert!(uris.contains(&"autosphere://config"));
        assert!(uris.contains(&"autosphere://deployment-manifest"));
        assert!(uris.contains(&"autosphere://health-report"));
        assert!(uris.contains(&"autosphere://awx-templates"));

        for resource in &resources {
            assert!(resource.raw.mime_type.is_some());
            assert!(resource.raw.description.is_some());
        }
    }

    #[test]
    fn test_manifest_is_yaml_shaped() {
        let manifest = deployment_manifest();
        assert!(manifest.contains("apiVersion: apps/v1"));
        assert!(manifest.contains("kind: Deployment"));
    }

    #[test]
    fn test_template_catalog_lists_standard_templates() {
        let catalog = awx_template_catalog();
        assert!(catalog.contains("autosphere-deploy"));
        assert!(catalog.contains("autosphere-backup"));
    }
}
