// src/analysis/schema.rs
//! Response schemas declared to the model. They mirror the serde shapes in
//! `types.rs`; the model output is still parsed and validated on receipt.

use serde_json::{json, Value};

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

pub fn portfolio_analysis() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallScore": {
                "type": "INTEGER",
                "description": "A single overall score from 0 to 100 for the entire portfolio."
            },
            "summary": {
                "type": "STRING",
                "description": "A two-paragraph summary of the portfolio's strengths and key areas for improvement, based on the provided repository list."
            },
            "scoreBreakdown": {
                "type": "OBJECT",
                "properties": {
                    "documentation": { "type": "INTEGER" },
                    "codeQuality": { "type": "INTEGER" },
                    "projectDiversity": { "type": "INTEGER" },
                    "commitPatterns": { "type": "INTEGER" },
                    "techStack": { "type": "INTEGER" }
                },
                "required": ["documentation", "codeQuality", "projectDiversity", "commitPatterns", "techStack"]
            },
            "repositories": {
                "type": "ARRAY",
                "description": "An analysis of the user's top 3-5 most impressive or relevant public repositories from the provided list.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "score": { "type": "INTEGER" },
                        "strengths": string_list(),
                        "areasForImprovement": string_list(),
                        "technologies": string_list()
                    },
                    "required": ["name", "description", "score", "strengths", "areasForImprovement", "technologies"]
                }
            },
            "recommendations": {
                "type": "ARRAY",
                "description": "A list of 5-7 actionable recommendations, prioritized.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING", "description": "A unique kebab-case ID." },
                        "priority": { "type": "STRING", "enum": ["High", "Medium", "Low"] },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "category": {
                            "type": "STRING",
                            "enum": ["Documentation", "Code Quality", "Project Diversity", "Tech Stack", "Professionalism"]
                        }
                    },
                    "required": ["id", "priority", "title", "description", "category"]
                }
            },
            "commitAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "consistency": { "type": "STRING" },
                    "messageQuality": { "type": "STRING" },
                    "frequency": { "type": "STRING" },
                    "summary": { "type": "STRING" }
                },
                "required": ["consistency", "messageQuality", "frequency", "summary"]
            },
            "techStackAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "languages": string_list(),
                    "frameworks": string_list(),
                    "tools": string_list(),
                    "summary": { "type": "STRING" },
                    "recommendations": string_list()
                },
                "required": ["languages", "frameworks", "tools", "summary", "recommendations"]
            }
        },
        "required": [
            "overallScore", "summary", "scoreBreakdown", "repositories",
            "recommendations", "commitAnalysis", "techStackAnalysis"
        ]
    })
}

pub fn single_repo_analysis() -> Value {
    let rating = json!({
        "type": "STRING",
        "enum": ["Excellent", "Good", "Fair", "Needs Improvement"]
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "repoName": { "type": "STRING" },
            "overallImpression": {
                "type": "STRING",
                "description": "A concise, one-paragraph summary of the repository's quality and purpose."
            },
            "codeStructure": {
                "type": "OBJECT",
                "properties": {
                    "rating": rating.clone(),
                    "feedback": {
                        "type": "STRING",
                        "description": "Detailed feedback on the file organization, naming conventions, and modularity based on the provided file tree."
                    }
                },
                "required": ["rating", "feedback"]
            },
            "readmeQuality": {
                "type": "OBJECT",
                "properties": {
                    "rating": rating,
                    "feedback": {
                        "type": "STRING",
                        "description": "Analysis of the README's completeness, clarity, and professionalism."
                    },
                    "suggestions": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                        "description": "3-4 specific suggestions for improving the README."
                    }
                },
                "required": ["rating", "feedback", "suggestions"]
            },
            "potentialImprovements": {
                "type": "ARRAY",
                "description": "A list of 2-3 high-impact, actionable improvements for this specific repository.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "area": {
                            "type": "STRING",
                            "description": "e.g., 'Error Handling', 'Component Reusability', 'Add Unit Tests'"
                        },
                        "suggestion": { "type": "STRING", "description": "A detailed suggestion for the improvement." }
                    },
                    "required": ["area", "suggestion"]
                }
            }
        },
        "required": ["repoName", "overallImpression", "codeStructure", "readmeQuality", "potentialImprovements"]
    })
}
