pub mod lmeds_similarity_estimator;
