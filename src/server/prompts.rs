//! MCP prompt surface — guided workflows as substituted text
//!
//! Two prompts: a deployment planning guide and a troubleshooting guide.
//! Each returns a single user-role message.

use rmcp::model::{
    GetPromptResult, Prompt, PromptArgument, PromptMessage, PromptMessageContent,
    PromptMessageRole,
};
use serde_json::Value;

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        required: Some(required),
    }
}

fn user_message(text: String) -> PromptMessage {
    PromptMessage {
        role: PromptMessageRole::User,
        content: PromptMessageContent::text(text),
    }
}

fn string_arg<'a>(
    arguments: Option<&'a serde_json::Map<String, Value>>,
    name: &str,
    default: &'a str,
) -> &'a str {
    arguments
        .and_then(|args| args.get(name))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

pub fn prompt_list() -> Vec<Prompt> {
    vec![
        Prompt::new(
            "deployment_planning",
            Some("Structured guidance for planning an Autosphere deployment"),
            Some(vec![
                argument("environment", "Target environment (e.g. production, staging)", true),
                argument("version", "Version to deploy", true),
                argument("components", "Components to deploy (default: all)", false),
            ]),
        ),
        Prompt::new(
            "troubleshooting",
            Some("Systematic troubleshooting guide for an Autosphere issue"),
            Some(vec![
                argument("issue", "Description of the problem", true),
                argument("component", "Affected component", true),
                argument("symptoms", "Observed symptoms", false),
            ]),
        ),
    ]
}

pub fn deployment_planning(arguments: Option<&serde_json::Map<String, Value>>) -> GetPromptResult {
    let environment = string_arg(arguments, "environment", "production");
    let version = string_arg(arguments, "version", "latest");
    let components = string_arg(arguments, "components", "all");

    let text = format!(
        r#"# Deployment Planning Guide for Autosphere

## Deployment Details
- **Environment**: {environment}
- **Version**: {version}
- **Components**: {components}

## Pre-Deployment Checklist
1. **Infrastructure Readiness**
   - [ ] Kubernetes cluster is healthy and accessible
   - [ ] Required namespaces exist
   - [ ] Container registry is accessible
   - [ ] Database migrations are ready
   - [ ] External dependencies are available

2. **Security & Access**
   - [ ] Service accounts have proper permissions
   - [ ] Secrets and ConfigMaps are updated
   - [ ] Network policies are configured
   - [ ] TLS certificates are valid

3. **Monitoring & Observability**
   - [ ] Monitoring systems are operational
   - [ ] Log aggregation is working
   - [ ] Alerting rules are configured
   - [ ] Dashboards are accessible

## Recommended AWX Job Templates
Based on your deployment requirements, consider using these AWX job templates:

1. **autosphere-deploy** - Main deployment job
   - Use for: Deploying application components
   - Required variables: namespace, image_tag, replicas

2. **autosphere-health-check** - Post-deployment validation
   - Use for: Verifying deployment success
   - Required variables: check_endpoints, check_databases

## Deployment Strategy for {environment}
- **Rolling Update**: Recommended for production to ensure zero-downtime
- **Blue-Green**: Consider for major version upgrades
- **Canary**: Use when introducing significant changes

## Post-Deployment Validation
1. Health check all services
2. Verify database connections
3. Test critical user flows
4. Monitor performance metrics
5. Check log outputs for errors

## Rollback Plan
If issues are detected:
1. Stop deployment immediately
2. Revert to previous version using AWX
3. Verify system stability
4. Investigate root cause

Would you like me to help you execute any of these steps using the available AWX tools?"#
    );

    GetPromptResult {
        description: Some(format!(
            "Deployment planning for {environment} environment"
        )),
        messages: vec![user_message(text)],
    }
}

pub fn troubleshooting(arguments: Option<&serde_json::Map<String, Value>>) -> GetPromptResult {
    let issue = string_arg(arguments, "issue", "Unknown issue");
    let component = string_arg(arguments, "component", "system");
    let symptoms = string_arg(arguments, "symptoms", "");

    let symptoms_section = if symptoms.is_empty() {
        String::new()
    } else {
        format!("- **Symptoms**: {symptoms}\n")
    };

    let text = format!(
        r#"# Troubleshooting Guide: {issue}

## Problem Summary
- **Issue**: {issue}
- **Component**: {component}
{symptoms_section}
## Initial Assessment
Let's start with basic diagnostics for the {component} component:

### Step 1: Check Component Health
Run the health check tool to get current status:
- Use the **health_check** tool to verify overall system health
- Focus on the {component} component specifically

### Step 2: Review Recent Changes
Consider recent deployments or configuration changes:
- Check AWX job history using **list_awx_jobs**
- Look for failed or recent jobs that might have caused issues

### Step 3: Examine Logs and Metrics
Investigate system logs and performance metrics:
- Check application logs for error patterns
- Review resource utilization (CPU, memory, network)
- Verify database connectivity and performance

## Common Causes for {component} Issues
Based on the component type, here are typical causes:

### Application Components (API, Web, Workers)
- Memory leaks or high resource usage
- Database connection pool exhaustion
- External service dependencies failing
- Configuration errors after deployment

### Infrastructure Components (Database, Cache)
- Disk space issues
- Network connectivity problems
- Resource limits exceeded
- Backup or maintenance operations

### Monitoring Components
- Metrics collection failures
- Alert rule misconfigurations
- Dashboard connectivity issues

## Systematic Diagnosis Steps
1. **Immediate Response**
   - Check if this is a widespread issue affecting multiple components
   - Verify if automatic scaling has been triggered
   - Look for active alerts in monitoring systems

2. **Deep Investigation**
   - Use **get_job_output** to review recent AWX job logs
   - Check **list_awx_resources** to verify infrastructure state
   - Examine component-specific metrics and logs

3. **Resolution Planning**
   - If scaling issue: Use **autoscale** tool to adjust resources
   - If deployment issue: Consider rollback using AWX deployment jobs
   - If configuration issue: Review and update configurations

## Recovery Actions
Based on findings, choose appropriate recovery method:
- **Scaling**: Increase resources if performance-related
- **Restart**: Restart affected services if temporary issue
- **Rollback**: Revert to last known good state if deployment-related
- **Hotfix**: Apply targeted fix if specific bug identified

Would you like me to help you execute any of these diagnostic steps using the available tools?"#
    );

    GetPromptResult {
        description: Some(format!(
            "Troubleshooting guide for {issue} issue in {component}"
        )),
        messages: vec![user_message(text)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_prompt_list() {
        let prompts = prompt_list();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].name, "deployment_planning");
        assert_eq!(prompts[1].name, "troubleshooting");
    }

    #[test]
    fn test_deployment_planning_substitutes_arguments() {
        let arguments = args(json!({"environment": "staging", "version": "3.1.0"}));
        let result = deployment_planning(Some(&arguments));

        let PromptMessageContent::Text { text } = &result.messages[0].content else {
            panic!("expected text content");
        };
        assert!(text.contains("**Environment**: staging"));
        assert!(text.contains("**Version**: 3.1.0"));
        assert!(text.contains("**Components**: all"));
    }

    #[test]
    fn test_deployment_planning_defaults() {
        let result = deployment_planning(None);
        let PromptMessageContent::Text { text } = &result.messages[0].content else {
            panic!("expected text content");
        };
        assert!(text.contains("**Environment**: production"));
        assert!(text.contains("**Version**: latest"));
    }

    #[test]
    fn test_troubleshooting_includes_symptoms_when_given() {
        let arguments = args(json!({
            "issue": "5xx spike",
            "component": "api",
            "symptoms": "latency above 2s",
        }));
        let result = troubleshooting(Some(&arguments));

        let PromptMessageContent::Text { text } = &result.messages[0].content else {
            panic!("expected text content");
        };
        assert!(text.contains("5xx spike"));
        assert!(text.contains("**Symptoms**: latency above 2s"));
        assert!(result.messages.len() == 1);
    }
}
